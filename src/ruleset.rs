// src/ruleset.rs
//! Versionable ruleset: every pattern, weight and threshold the classifier uses.
//!
//! The ruleset is plain data loaded from TOML (`config/ruleset.toml` by default). It is
//! validated once at startup; a malformed ruleset is the only fatal condition of a run.
//! Compiled regexes are owned by the gate and the scoring engine built from it, never
//! cached process-wide.

use anyhow::{anyhow, bail, Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Category;

// --- env defaults & names ---
pub const DEFAULT_RULESET_PATH: &str = "config/ruleset.toml";
pub const ENV_RULESET_PATH: &str = "RELAY_RULESET_PATH";
/// A century; keeps `chrono::Duration::hours` in range.
pub const MAX_RECENCY_HOURS: i64 = 24 * 365 * 100;

const BUILTIN_RULESET: &str = include_str!("../config/ruleset.toml");

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Ruleset {
    #[serde(default)]
    pub version: String,
    pub thresholds: ThresholdsCfg,
    pub gate: GateCfg,
    #[serde(default)]
    pub watchlist: WatchlistCfg,
    #[serde(default)]
    pub publishers: PublishersCfg,
    #[serde(default)]
    pub recency: RecencyCfg,
    pub severity: SeverityCfg,
    #[serde(default)]
    pub signals: Vec<SignalCfg>,
    #[serde(default)]
    pub quantities: Vec<QuantityCfg>,
    #[serde(default)]
    pub urgent: UrgentCfg,
    #[serde(default)]
    pub dedup: DedupCfg,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ThresholdsCfg {
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
    /// Independent inclusion floor; may sit above `p3`.
    pub min_include: u32,
    /// `urgent` also fires when score > p1 + urgent_margin.
    #[serde(default = "default_urgent_margin")]
    pub urgent_margin: u32,
}

fn default_urgent_margin() -> u32 {
    80
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    Loose,
    #[default]
    Strict,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateCfg {
    #[serde(default)]
    pub policy: GatePolicy,
    /// Per-category override, keyed by category name (e.g. "meteorological-alert").
    #[serde(default)]
    pub category_policy: HashMap<String, GatePolicy>,
    /// Bypass the regional policy; the universal exclude still applies.
    #[serde(default)]
    pub force: bool,
    pub exclude: Vec<String>,
    #[serde(default)]
    pub allow_regions: Vec<String>,
    #[serde(default)]
    pub disallow_regions: Vec<String>,
}

impl GateCfg {
    pub fn policy_for(&self, category: Category) -> GatePolicy {
        self.category_policy
            .get(category.as_str())
            .copied()
            .unwrap_or(self.policy)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchlistCfg {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub bonus: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PublishersCfg {
    /// Canonical trusted publisher names.
    #[serde(default)]
    pub trusted: Vec<String>,
    /// Alternative spellings → canonical name.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub bonus: u32,
    /// Link hosts that identify a regional publisher (suffix match).
    #[serde(default)]
    pub trusted_domains: Vec<String>,
    /// Country top-level domains counted as regional evidence.
    #[serde(default)]
    pub allowed_tlds: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RecencyCfg {
    pub fresh_hours: i64,
    pub fresh_bonus: u32,
    pub recent_hours: i64,
    pub recent_bonus: u32,
}

impl Default for RecencyCfg {
    fn default() -> Self {
        Self {
            fresh_hours: 6,
            fresh_bonus: 10,
            recent_hours: 24,
            recent_bonus: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeverityPolicy {
    OrangeOrAbove,
    YellowOrAbove,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeverityCfg {
    pub policy: SeverityPolicy,
    pub red_pattern: String,
    pub orange_pattern: String,
    pub yellow_pattern: String,
    pub hazard_pattern: String,
    pub bonus_hazard_pattern: String,
    pub red: u32,
    pub orange: u32,
    pub yellow: u32,
    pub hazard_bonus: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalCfg {
    pub name: String,
    /// Signal family, informational (e.g. "security", "transport").
    #[serde(default)]
    pub category: String,
    pub pattern: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuantityCfg {
    pub name: String,
    /// Must contain a named capture group `n` holding the number.
    pub pattern: String,
    pub multiplier: u32,
    pub floor: u32,
    pub cap: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UrgentCfg {
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    #[default]
    RatcliffObershelp,
    Levenshtein,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct DedupCfg {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub metric: SimilarityMetric,
}

fn default_similarity_threshold() -> f64 {
    0.96
}

impl Default for DedupCfg {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            metric: SimilarityMetric::default(),
        }
    }
}

/* ----------------------------
Loading + validation
---------------------------- */

impl Ruleset {
    /// Load from `RELAY_RULESET_PATH` or `config/ruleset.toml`.
    pub fn from_default_path() -> Result<Self> {
        let path = std::env::var(ENV_RULESET_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_RULESET_PATH));
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading ruleset from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("ruleset {}", path.display()))
    }

    /// Parse and validate. Regexes are compiled here once to surface errors early;
    /// the gate and scorer compile their own copies.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let rs: Ruleset = toml::from_str(toml_str).context("parsing ruleset toml")?;
        rs.validate()?;
        Ok(rs)
    }

    /// The ruleset shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULESET)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !(t.p1 > t.p2 && t.p2 > t.p3) {
            bail!(
                "priority thresholds must be strictly descending (p1={} p2={} p3={})",
                t.p1,
                t.p2,
                t.p3
            );
        }
        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            bail!(
                "dedup.similarity_threshold must be within 0..=1, got {}",
                self.dedup.similarity_threshold
            );
        }
        for (id, hours) in [
            ("fresh_hours", self.recency.fresh_hours),
            ("recent_hours", self.recency.recent_hours),
        ] {
            if !(0..=MAX_RECENCY_HOURS).contains(&hours) {
                bail!("recency.{id} must be within 0..={MAX_RECENCY_HOURS}, got {hours}");
            }
        }
        if self.recency.fresh_hours > self.recency.recent_hours {
            bail!("recency.fresh_hours must not exceed recency.recent_hours");
        }

        compile_all("gate.exclude", &self.gate.exclude)?;
        compile_all("gate.allow_regions", &self.gate.allow_regions)?;
        compile_all("gate.disallow_regions", &self.gate.disallow_regions)?;
        compile_all("watchlist", &self.watchlist.patterns)?;
        compile_all("urgent", &self.urgent.patterns)?;

        let s = &self.severity;
        for (id, p) in [
            ("red_pattern", &s.red_pattern),
            ("orange_pattern", &s.orange_pattern),
            ("yellow_pattern", &s.yellow_pattern),
            ("hazard_pattern", &s.hazard_pattern),
            ("bonus_hazard_pattern", &s.bonus_hazard_pattern),
        ] {
            compile_pattern("severity", id, p)?;
        }

        for sig in &self.signals {
            if sig.name.trim().is_empty() {
                bail!("signal with empty name (pattern `{}`)", sig.pattern);
            }
            compile_pattern("signal", &sig.name, &sig.pattern)?;
        }

        for q in &self.quantities {
            let re = compile_pattern("quantity", &q.name, &q.pattern)?;
            if !re.capture_names().any(|n| n == Some("n")) {
                bail!("quantity `{}` pattern has no `(?P<n>...)` group", q.name);
            }
            if q.floor > q.cap {
                bail!("quantity `{}` floor {} exceeds cap {}", q.name, q.floor, q.cap);
            }
        }

        Ok(())
    }
}

/// Compile one ruleset pattern case-insensitively, naming it in the error.
pub fn compile_pattern(kind: &str, id: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| anyhow!("{kind} `{id}` regex error: {e}"))
}

/// Compile a list of anonymous patterns; errors carry the list name and index.
pub fn compile_all(kind: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| compile_pattern(kind, &format!("#{i}"), p))
        .collect()
}
