//! model.rs: entry and item types shared by the gate, scorer, dedup and replay stages.
//!
//! Everything here is created fresh per pipeline run; nothing carries state across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of source an entry came from. Drives the weather veto and the per-category gate policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    MeteorologicalAlert,
    IncidentAlert,
    #[default]
    News,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::MeteorologicalAlert => "meteorological-alert",
            Category::IncidentAlert => "incident-alert",
            Category::News => "news",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal priority. Variant order matters: `None < P3 < P2 < P1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    None,
    P3,
    P2,
    P1,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::None => "NONE",
            Priority::P3 => "P3",
            Priority::P2 => "P2",
            Priority::P1 => "P1",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed entry as delivered by a source provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: String,
    /// Best-effort publish time; `None` means "use ingestion time".
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category: Category,
}

impl RawEntry {
    /// Title and summary joined with a single space; this is what every pattern runs against.
    pub fn joined_text(&self) -> String {
        if self.summary.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.summary)
        }
    }
}

/// An entry that passed the gate and the priority classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub category: Category,
    /// Resolved publish time (falls back to the run's `now`).
    pub published_at: DateTime<Utc>,
    pub score: u32,
    pub priority: Priority,
    /// Display-only; never affects priority or inclusion.
    pub urgent: bool,
    /// Names of the signals that contributed, in evaluation order.
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl ScoredItem {
    /// Sort key used by the deduplicator: higher priority, then score, then recency.
    pub fn rank_key(&self) -> (Priority, u32, DateTime<Utc>) {
        (self.priority, self.score, self.published_at)
    }
}

/// A ranked item with its final identifier, ready for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledItem {
    #[serde(flatten)]
    pub item: ScoredItem,
    pub id: String,
    pub replayed: bool,
}
