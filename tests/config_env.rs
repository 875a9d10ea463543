// tests/config_env.rs
// Environment overrides for the relay config. Serialized: tests mutate process env and CWD.

use emea_feed_relay::config::{
    RelayConfig, ENV_CONFIG_PATH, ENV_MAX_ITEMS, ENV_PUBLIC_SCORES, ENV_REPLAY_COUNT,
    ENV_REPLAY_SEED, ENV_SINCE_HOURS, ENV_TIERS,
};
use emea_feed_relay::feed::TitleStyle;
use serial_test::serial;
use std::{env, fs};

const VARS: &[&str] = &[
    ENV_CONFIG_PATH,
    ENV_MAX_ITEMS,
    ENV_PUBLIC_SCORES,
    ENV_REPLAY_COUNT,
    ENV_REPLAY_SEED,
    ENV_SINCE_HOURS,
    ENV_TIERS,
    "RELAY_OUTPUT_PATH",
    "RELAY_RULESET_PATH",
];

fn clear_env() {
    for v in VARS {
        env::remove_var(v);
    }
}

const FILE: &str = r#"
[output]
public_scores = true

[run]
max_items = 50
replay_count = 2
replay_seed = "file-seed"
tiers = ["tier1"]

[[sources]]
name = "Alerts"
location = "fixtures/a.json"
category = "incident-alert"
tier = "tier1"

[[sources]]
name = "Wire"
location = "https://wire.test/feed.json"
category = "news"
tier = "tier2"
"#;

#[test]
#[serial]
fn file_values_then_env_wins() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(&path, FILE).unwrap();
    env::set_var(ENV_CONFIG_PATH, &path);

    let cfg = RelayConfig::load().unwrap();
    assert_eq!(cfg.run.max_items, 50);
    assert_eq!(cfg.run.replay_seed, "file-seed");
    let names: Vec<_> = cfg
        .selected_sources()
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Alerts"]);

    env::set_var(ENV_MAX_ITEMS, "10");
    env::set_var(ENV_REPLAY_COUNT, "0");
    env::set_var(ENV_REPLAY_SEED, "env-seed");
    env::set_var(ENV_SINCE_HOURS, "24");
    env::set_var(ENV_TIERS, "tier1, tier2");
    env::set_var(ENV_PUBLIC_SCORES, "false");

    let cfg = RelayConfig::load().unwrap();
    let opts = cfg.run_options();
    assert_eq!(opts.max_items, 10);
    assert_eq!(opts.replay_count, 0);
    assert_eq!(opts.replay_seed, "env-seed");
    assert_eq!(opts.since_hours, 24);
    assert_eq!(cfg.title_style(), TitleStyle::Hidden);
    assert_eq!(cfg.selected_sources().unwrap().len(), 2);

    clear_env();
}

#[test]
#[serial]
fn unparsable_number_is_ignored() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(&path, FILE).unwrap();
    env::set_var(ENV_CONFIG_PATH, &path);
    env::set_var(ENV_MAX_ITEMS, "lots");

    let cfg = RelayConfig::load().unwrap();
    assert_eq!(cfg.run.max_items, 50);

    clear_env();
}

#[test]
#[serial]
fn unknown_tier_is_fatal() {
    clear_env();
    env::set_var(ENV_TIERS, "tier1,gold");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(&path, FILE).unwrap();
    env::set_var(ENV_CONFIG_PATH, &path);

    let err = RelayConfig::load().unwrap_err();
    assert!(format!("{err:#}").contains("gold"), "{err:#}");

    clear_env();
}

#[test]
#[serial]
fn explicit_missing_config_path_is_an_error() {
    clear_env();
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/relay.toml");
    assert!(RelayConfig::load().is_err());
    clear_env();
}

#[test]
#[serial]
fn missing_default_file_means_defaults() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    let cfg = RelayConfig::load();

    env::set_current_dir(old).unwrap();
    let cfg = cfg.unwrap();
    assert_eq!(cfg, RelayConfig::default());
    assert!(cfg.sources.is_empty());
}

#[test]
#[serial]
fn missing_default_ruleset_falls_back_to_builtin() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    let rs = RelayConfig::default().load_ruleset();

    env::set_current_dir(old).unwrap();
    let rs = rs.unwrap();
    assert_eq!(rs.version, emea_feed_relay::Ruleset::builtin().unwrap().version);
}

#[test]
#[serial]
fn explicit_ruleset_path_must_exist() {
    clear_env();
    env::set_var("RELAY_RULESET_PATH", "/definitely/not/here/ruleset.toml");
    let mut cfg = RelayConfig::default();
    cfg.apply_env_overrides().unwrap();
    assert!(cfg.load_ruleset().is_err());
    clear_env();
}

#[test]
#[serial]
fn command_line_flags_beat_env_and_file() {
    use clap::Parser as _;
    use emea_feed_relay::cli::RelayOnceArgs;

    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(&path, FILE).unwrap();
    env::set_var(ENV_CONFIG_PATH, &path);
    env::set_var(ENV_MAX_ITEMS, "10");
    env::set_var(ENV_TIERS, "tier1,tier2");

    let mut cfg = RelayConfig::load().unwrap();
    assert_eq!(cfg.run.max_items, 10);

    let args =
        RelayOnceArgs::try_parse_from(["relay-once", "--max-items", "5", "--tiers", "tier2"]).unwrap();
    args.apply(&mut cfg).unwrap();
    assert_eq!(cfg.run.max_items, 5);
    let names: Vec<_> = cfg
        .selected_sources()
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Wire"]);
    // Untouched by flags: the file value survives.
    assert_eq!(cfg.run.replay_seed, "file-seed");

    clear_env();
}
