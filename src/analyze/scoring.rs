//! Scoring engine: additive integer score over compiled ruleset signals.
//!
//! Contributions, in evaluation order:
//! - every matching signal weight (summed, no per-category capping),
//! - watchlist bonus when a city or hub is named,
//! - weather severity (with the meteorological hard veto),
//! - quantity phrases,
//! - recency bonus,
//! - trusted publisher bonus.
//!
//! The engine is pure: same inputs and `now` give the same `Score`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use super::quantity::QuantityExtractor;
use super::severity::{SeverityAssessment, SeverityRules};
use crate::model::Category;
use crate::publishers::Publishers;
use crate::ruleset::{compile_all, compile_pattern, RecencyCfg, Ruleset};

/// What the scorer looks at for one entry.
#[derive(Clone, Copy, Debug)]
pub struct ScoreInputs<'a> {
    /// Title and summary joined.
    pub text: &'a str,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub source: &'a str,
    pub link: &'a str,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Score {
    pub value: u32,
    pub urgent: bool,
    /// Set when the severity veto zeroed the entry.
    pub vetoed: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug)]
struct Signal {
    name: String,
    re: Regex,
    weight: u32,
}

#[derive(Debug)]
pub struct ScoringEngine {
    signals: Vec<Signal>,
    watchlist: Vec<Regex>,
    watchlist_bonus: u32,
    severity: SeverityRules,
    quantities: QuantityExtractor,
    recency: RecencyCfg,
    publishers: Publishers,
    urgent: Vec<Regex>,
    urgent_above: u32,
}

impl ScoringEngine {
    pub fn new(rs: &Ruleset) -> Result<Self> {
        let signals = rs
            .signals
            .iter()
            .map(|s| {
                Ok(Signal {
                    name: s.name.clone(),
                    re: compile_pattern("signal", &s.name, &s.pattern)?,
                    weight: s.weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            signals,
            watchlist: compile_all("watchlist", &rs.watchlist.patterns)?,
            watchlist_bonus: rs.watchlist.bonus,
            severity: SeverityRules::new(&rs.severity)?,
            quantities: QuantityExtractor::new(&rs.quantities)?,
            recency: rs.recency,
            publishers: Publishers::new(&rs.publishers),
            urgent: compile_all("urgent", &rs.urgent.patterns)?,
            urgent_above: rs
                .thresholds
                .p1
                .saturating_add(rs.thresholds.urgent_margin),
        })
    }

    pub fn score(&self, inputs: &ScoreInputs<'_>, now: DateTime<Utc>) -> Score {
        let text = inputs.text;

        // Weather veto first: nothing else can rescue a sub-threshold alert.
        let severity = self.severity.assess(text, inputs.category);
        if let SeverityAssessment::Veto { tier } = severity {
            return Score {
                value: 0,
                urgent: false,
                vetoed: true,
                reasons: vec![format!("veto:severity:{}", tier.as_str())],
            };
        }

        let mut value: u32 = 0;
        let mut reasons = Vec::new();

        for s in &self.signals {
            if s.re.is_match(text) {
                value = value.saturating_add(s.weight);
                reasons.push(s.name.clone());
            }
        }

        if self.watchlist.iter().any(|re| re.is_match(text)) {
            value = value.saturating_add(self.watchlist_bonus);
            reasons.push("watchlist".into());
        }

        if let SeverityAssessment::Contribution {
            tier,
            value: tier_value,
            hazard_bonus,
        } = severity
        {
            if tier_value > 0 {
                value = value.saturating_add(tier_value);
                reasons.push(format!("severity:{}", tier.as_str()));
            }
            if hazard_bonus > 0 {
                value = value.saturating_add(hazard_bonus);
                reasons.push("hazard".into());
            }
        }

        for hit in self.quantities.extract(text) {
            value = value.saturating_add(hit.points);
            reasons.push(format!("qty:{}={}", hit.name, hit.count));
        }

        let recency = self.recency_bonus(inputs.published_at, now);
        if recency > 0 {
            value = value.saturating_add(recency);
            reasons.push("recency".into());
        }

        let trust = self.publishers.trust_bonus(inputs.source, inputs.link);
        if trust > 0 {
            value = value.saturating_add(trust);
            reasons.push("publisher".into());
        }

        let urgent = value > self.urgent_above || self.urgent.iter().any(|re| re.is_match(text));

        Score {
            value,
            urgent,
            vetoed: false,
            reasons,
        }
    }

    /// Entries dated in the future count as fresh.
    fn recency_bonus(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        let age = now.signed_duration_since(published_at);
        if age <= Duration::hours(self.recency.fresh_hours) {
            self.recency.fresh_bonus
        } else if age <= Duration::hours(self.recency.recent_hours) {
            self.recency.recent_bonus
        } else {
            0
        }
    }
}
