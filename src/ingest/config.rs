// src/ingest/config.rs
//! Source definitions and tier selection.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::providers::{HttpJsonProvider, JsonFileProvider};
use crate::ingest::ConfiguredSource;
use crate::model::{Category, Priority};
use crate::pipeline::ItemContext;

pub const KNOWN_TIERS: &[&str] = &["tier1", "tier2", "tier3"];
pub const DEFAULT_TIERS: &[&str] = &["tier1", "tier2"];
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// One `[[sources]]` entry of the relay config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceCfg {
    pub name: String,
    /// `http(s)://` URL or a local path to a JSON payload.
    pub location: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "default_tier")]
    pub tier: String,
    /// Push-alert sources: emitted at this priority whatever they score.
    #[serde(default)]
    pub forced_priority: Option<Priority>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_tier() -> String {
    "tier1".into()
}

impl SourceCfg {
    pub fn is_http(&self) -> bool {
        let l = self.location.trim().to_ascii_lowercase();
        l.starts_with("http://") || l.starts_with("https://")
    }

    pub fn context(&self) -> ItemContext {
        ItemContext {
            category: self.category,
            source_label: self.name.clone(),
            forced_priority: self.forced_priority,
        }
    }
}

/// Parse a comma list like `"tier1, tier2"`. Unknown tiers are fatal.
pub fn parse_tiers(raw: &str) -> Result<Vec<String>> {
    let tiers: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    validate_tiers(&tiers)?;
    Ok(tiers)
}

pub fn validate_tiers(tiers: &[String]) -> Result<()> {
    for t in tiers {
        if !KNOWN_TIERS.contains(&t.as_str()) {
            bail!("unknown tier `{t}` (expected one of {})", KNOWN_TIERS.join(", "));
        }
    }
    Ok(())
}

/// Sources whose tier is selected, in configured order.
pub fn select_sources(sources: &[SourceCfg], tiers: &[String]) -> Result<Vec<SourceCfg>> {
    validate_tiers(tiers)?;
    for s in sources {
        if !KNOWN_TIERS.contains(&s.tier.as_str()) {
            bail!("source `{}` has unknown tier `{}`", s.name, s.tier);
        }
    }
    Ok(sources
        .iter()
        .filter(|s| tiers.iter().any(|t| *t == s.tier))
        .cloned()
        .collect())
}

/// Instantiate providers for the selected sources.
pub fn build_sources(sources: &[SourceCfg], default_timeout: Duration) -> Vec<ConfiguredSource> {
    let client = reqwest::Client::new();
    sources
        .iter()
        .map(|s| {
            let provider: Arc<dyn crate::ingest::types::SourceProvider> = if s.is_http() {
                Arc::new(HttpJsonProvider::with_client(
                    s.name.clone(),
                    s.location.clone(),
                    s.category,
                    client.clone(),
                ))
            } else {
                Arc::new(JsonFileProvider::new(
                    s.name.clone(),
                    s.location.clone(),
                    s.category,
                ))
            };
            ConfiguredSource {
                provider,
                context: s.context(),
                timeout: s
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(default_timeout),
            }
        })
        .collect()
}
