// src/config/mod.rs
//! Relay configuration: `config/relay.toml` plus `RELAY_*` environment overrides.
//!
//! Precedence: environment > file > built-in defaults. A missing default file means
//! "all defaults"; an explicit `RELAY_CONFIG_PATH` that does not exist is an error.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::{ChannelMeta, TitleStyle};
use crate::ingest::config::{
    parse_tiers, select_sources, validate_tiers, SourceCfg, DEFAULT_SOURCE_TIMEOUT_SECS,
    DEFAULT_TIERS,
};
use crate::pipeline::{RunOptions, DEFAULT_MAX_ITEMS};
use crate::replay::DEFAULT_REPLAY_STEP_SECS;
use crate::ruleset::{Ruleset, DEFAULT_RULESET_PATH, ENV_RULESET_PATH};

// --- env names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_MAX_ITEMS: &str = "RELAY_MAX_ITEMS";
pub const ENV_REPLAY_COUNT: &str = "RELAY_REPLAY_COUNT";
pub const ENV_REPLAY_SEED: &str = "RELAY_REPLAY_SEED";
pub const ENV_TIERS: &str = "RELAY_TIERS";
pub const ENV_PUBLIC_SCORES: &str = "RELAY_PUBLIC_SCORES";
pub const ENV_SINCE_HOURS: &str = "RELAY_SINCE_HOURS";
pub const ENV_OUTPUT_PATH: &str = "RELAY_OUTPUT_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunCfg {
    pub max_items: usize,
    pub since_hours: u32,
    pub replay_count: usize,
    pub replay_seed: String,
    pub replay_step_secs: i64,
    pub force: bool,
    pub tiers: Vec<String>,
    pub source_timeout_secs: u64,
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            since_hours: 0,
            replay_count: 0,
            replay_seed: String::new(),
            replay_step_secs: DEFAULT_REPLAY_STEP_SECS,
            force: false,
            tiers: DEFAULT_TIERS.iter().map(|t| t.to_string()).collect(),
            source_timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputCfg {
    pub path: PathBuf,
    /// Decorate titles with priority and score.
    pub public_scores: bool,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("emea-filtered.xml"),
            public_scores: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub feed: ChannelMeta,
    pub output: OutputCfg,
    pub run: RunCfg,
    pub ruleset_path: Option<PathBuf>,
    pub sources: Vec<SourceCfg>,
}

impl RelayConfig {
    /// Load from `RELAY_CONFIG_PATH` or `config/relay.toml`, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::from_path(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                if pb.exists() {
                    Self::from_path(&pb)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        validate_tiers(&cfg.run.tiers)?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("relay config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RelayConfig = toml::from_str(s).context("parsing relay config toml")?;
        validate_tiers(&cfg.run.tiers)?;
        Ok(cfg)
    }

    /// Environment wins over the file. Unparsable numbers are ignored with a warning;
    /// an unknown tier is an error.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(n) = parse_env_num::<usize>(ENV_MAX_ITEMS) {
            self.run.max_items = n;
        }
        if let Some(n) = parse_env_num::<usize>(ENV_REPLAY_COUNT) {
            self.run.replay_count = n;
        }
        if let Some(n) = parse_env_num::<u32>(ENV_SINCE_HOURS) {
            self.run.since_hours = n;
        }
        if let Ok(seed) = std::env::var(ENV_REPLAY_SEED) {
            self.run.replay_seed = seed;
        }
        if let Ok(raw) = std::env::var(ENV_TIERS) {
            self.run.tiers = parse_tiers(&raw).with_context(|| format!("{ENV_TIERS}={raw}"))?;
        }
        if let Some(b) = std::env::var(ENV_PUBLIC_SCORES).ok().and_then(|v| parse_bool(&v)) {
            self.output.public_scores = b;
        }
        if let Ok(p) = std::env::var(ENV_OUTPUT_PATH) {
            if !p.trim().is_empty() {
                self.output.path = PathBuf::from(p.trim());
            }
        }
        if let Ok(p) = std::env::var(ENV_RULESET_PATH) {
            if !p.trim().is_empty() {
                self.ruleset_path = Some(PathBuf::from(p.trim()));
            }
        }
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_items: self.run.max_items,
            since_hours: self.run.since_hours,
            replay_count: self.run.replay_count,
            replay_seed: self.run.replay_seed.clone(),
            replay_step: chrono::Duration::seconds(self.run.replay_step_secs.max(0)),
            force: self.run.force,
        }
    }

    pub fn title_style(&self) -> TitleStyle {
        if self.output.public_scores {
            TitleStyle::Public
        } else {
            TitleStyle::Hidden
        }
    }

    pub fn ruleset_path(&self) -> PathBuf {
        self.ruleset_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULESET_PATH))
    }

    /// The configured ruleset file, or the built-in one when the default path is absent.
    pub fn load_ruleset(&self) -> Result<Ruleset> {
        let path = self.ruleset_path();
        if self.ruleset_path.is_none() && !path.exists() {
            return Ruleset::builtin();
        }
        Ruleset::from_path(&path)
    }

    pub fn selected_sources(&self) -> Result<Vec<SourceCfg>> {
        select_sources(&self.sources, &self.run.tiers)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.run.source_timeout_secs.max(1))
    }
}

fn parse_env_num<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(target: "config", var = name, value = %raw, "ignoring unparsable number");
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_relay_script() {
        let c = RelayConfig::default();
        assert_eq!(c.run.max_items, 250);
        assert_eq!(c.run.tiers, vec!["tier1", "tier2"]);
        assert_eq!(c.output.path, PathBuf::from("emea-filtered.xml"));
        assert_eq!(c.title_style(), TitleStyle::Public);
        assert_eq!(c.feed.title, "EMEA SOC Filtered Feed");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = RelayConfig::from_toml_str(
            r#"
[run]
max_items = 10
replay_count = 3

[output]
public_scores = false
"#,
        )
        .unwrap();
        assert_eq!(c.run.max_items, 10);
        assert_eq!(c.run.since_hours, 0);
        let o = c.run_options();
        assert_eq!(o.replay_count, 3);
        assert_eq!(o.replay_step, chrono::Duration::seconds(60));
        assert_eq!(c.title_style(), TitleStyle::Hidden);
    }

    #[test]
    fn unknown_tier_in_file_is_fatal() {
        assert!(RelayConfig::from_toml_str("[run]\ntiers = [\"tier7\"]\n").is_err());
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
