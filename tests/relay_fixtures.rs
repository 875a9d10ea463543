// tests/relay_fixtures.rs
//
// Full relay run over the bundled fixtures: file providers → classify → RSS.
// Tests run from the package root, so the relative fixture paths in
// config/relay.toml resolve as they do for `relay-once`.

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;

use emea_feed_relay::config::RelayConfig;
use emea_feed_relay::relay::Relay;
use emea_feed_relay::Priority;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 3, 12, 0, 0).unwrap()
}

fn relay(tiers: &[&str]) -> Relay {
    let mut cfg = RelayConfig::from_path(Path::new("config/relay.toml")).expect("relay.toml");
    cfg.run.tiers = tiers.iter().map(|t| t.to_string()).collect();
    Relay::from_config(cfg).expect("relay")
}

#[tokio::test]
async fn default_tiers_over_fixtures() {
    let run = relay(&["tier1", "tier2"]).run(now()).await;
    assert!(run.failed_sources.is_empty(), "{:?}", run.failed_sources);

    let links: Vec<&str> = run.items.iter().map(|i| i.link.as_str()).collect();
    assert!(links.contains(&"https://www.bbc.co.uk/news/world-europe-1"));
    assert!(links.contains(&"https://meteoalarm.org/en/uk/ni/3"));
    assert!(links.contains(&"https://www.gov.uk/foreign-travel-advice/france"));

    // Yellow veto and sports noise.
    assert!(!links.contains(&"https://meteoalarm.org/en/uk/kent/1"));
    assert!(!links.iter().any(|l| l.contains("/sport/")));

    // Brussels story reported twice, kept once.
    let brussels = links
        .iter()
        .filter(|l| l.ends_with("world-europe-2") || l.ends_with("world-europe-3"))
        .count();
    assert_eq!(brussels, 1);
    assert!(run.stats.near_dupes >= 1);

    // tier3 wire is not selected by default.
    assert!(!links.iter().any(|l| l.contains("wire.example")));

    let push = run
        .items
        .iter()
        .find(|i| i.link.ends_with("/foreign-travel-advice/france"))
        .unwrap();
    assert_eq!(push.priority, Priority::P1);

    for w in run.items.windows(2) {
        assert!(
            (w[0].priority, w[0].score) >= (w[1].priority, w[1].score),
            "feed out of order"
        );
    }
}

#[tokio::test]
async fn tier3_wire_is_gated_by_region() {
    let run = relay(&["tier3"]).run(now()).await;
    let links: Vec<&str> = run.items.iter().map(|i| i.link.as_str()).collect();
    assert!(links.contains(&"https://wire.example.pl/1"));
    assert!(!links.contains(&"https://wire.example.com/2"));
    assert_eq!(run.stats.gated, 1);
}

#[tokio::test]
async fn render_feed_produces_rss() {
    let (xml, run) = relay(&["tier1", "tier2"]).render_feed(now()).await.unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<rss version=\"2.0\">"));
    assert_eq!(xml.matches("<item>").count(), run.items.len());
    assert!(xml.contains("isPermaLink=\"false\""));
}
