// src/cli.rs
//! Command-line surface of `relay-once`. Flags override the loaded `RelayConfig`
//! (file and `RELAY_*` environment), so precedence is flag > env > file > default.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::RelayConfig;
use crate::ingest::config::parse_tiers;

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(author, version, about = "Build the filtered EMEA RSS feed once", long_about = None)]
pub struct RelayOnceArgs {
    /// Comma list of source tiers: tier1,tier2,tier3
    #[arg(long)]
    pub tiers: Option<String>,

    /// Only include items newer than N hours (0 = disabled)
    #[arg(long)]
    pub since_hours: Option<u32>,

    /// Cap total items in the output feed
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Output RSS file path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Feed title
    #[arg(long)]
    pub title: Option<String>,

    /// Feed link / homepage
    #[arg(long)]
    pub homepage: Option<String>,

    /// Bypass the regional policy (noise exclusion still applies)
    #[arg(long)]
    pub force: bool,
}

impl RelayOnceArgs {
    /// Apply every flag that was given. An unknown tier is an error.
    pub fn apply(&self, cfg: &mut RelayConfig) -> Result<()> {
        if let Some(raw) = &self.tiers {
            cfg.run.tiers = parse_tiers(raw).with_context(|| format!("--tiers {raw}"))?;
        }
        if let Some(n) = self.since_hours {
            cfg.run.since_hours = n;
        }
        if let Some(n) = self.max_items {
            cfg.run.max_items = n;
        }
        if let Some(p) = &self.output {
            cfg.output.path = p.clone();
        }
        if let Some(t) = &self.title {
            cfg.feed.title = t.clone();
        }
        if let Some(h) = &self.homepage {
            cfg.feed.link = h.clone();
        }
        if self.force {
            cfg.run.force = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let args = RelayOnceArgs::try_parse_from([
            "relay-once",
            "--tiers",
            "tier3",
            "--max-items",
            "5",
            "--since-hours",
            "12",
            "--output",
            "out.xml",
            "--title",
            "Ops Feed",
            "--homepage",
            "https://ops.test",
            "--force",
        ])
        .unwrap();

        let mut cfg = RelayConfig::default();
        cfg.run.max_items = 50;
        args.apply(&mut cfg).unwrap();

        assert_eq!(cfg.run.tiers, vec!["tier3".to_string()]);
        assert_eq!(cfg.run.max_items, 5);
        assert_eq!(cfg.run.since_hours, 12);
        assert_eq!(cfg.output.path, PathBuf::from("out.xml"));
        assert_eq!(cfg.feed.title, "Ops Feed");
        assert_eq!(cfg.feed.link, "https://ops.test");
        assert!(cfg.run.force);
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let args = RelayOnceArgs::try_parse_from(["relay-once"]).unwrap();
        let mut cfg = RelayConfig::default();
        cfg.run.max_items = 50;
        cfg.run.force = true;
        args.apply(&mut cfg).unwrap();

        assert_eq!(cfg.run.max_items, 50);
        assert!(cfg.run.force);
        assert_eq!(cfg.run.tiers, RelayConfig::default().run.tiers);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(RelayOnceArgs::try_parse_from(["relay-once", "--forse"]).is_err());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let args = RelayOnceArgs::try_parse_from(["relay-once", "--tiers", "tier1,gold"]).unwrap();
        let mut cfg = RelayConfig::default();
        let err = args.apply(&mut cfg).unwrap_err();
        assert!(format!("{err:#}").contains("gold"));
    }
}
