// src/relevance.rs
//! Relevance gate: universal noise exclusion plus the regional-relevance policy.
//!
//! The gate runs strictly before scoring and never looks at a score. Order of checks:
//! 1. exclude list (dominates everything),
//! 2. `force` bypass of the regional policy,
//! 3. loose or strict regional policy, chosen per entry category.

use anyhow::Result;
use regex::Regex;
use std::collections::HashMap;
use tracing::info;

use crate::model::Category;
use crate::publishers::{Publishers, SourceEvidence};
use crate::ruleset::{compile_all, GatePolicy, Ruleset};

// Dev logging gate: RELAY_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("RELAY_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

// Short, stable fingerprint used in logs instead of raw entry text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for gate decisions.
fn dev_log_gate(event: &str, text: &str, category: Category, reasons: &[String]) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    let reasons_short = truncate_vec(reasons, 5);
    // Never log raw text. Only hashed id + short lists.
    info!(
        target: "relevance",
        %id, %category, event,
        reasons = ?reasons_short
    );
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/// Outcome of a gate evaluation with the markers that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub admitted: bool,
    pub reasons: Vec<String>,
}

impl GateDecision {
    fn admit(reasons: Vec<String>) -> Self {
        Self {
            admitted: true,
            reasons,
        }
    }

    fn reject(reason: String) -> Self {
        Self {
            admitted: false,
            reasons: vec![reason],
        }
    }
}

/// Compiled gate. Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct RelevanceGate {
    exclude: Vec<Regex>,
    allow: Vec<Regex>,
    disallow: Vec<Regex>,
    watchlist: Vec<Regex>,
    publishers: Publishers,
    policies: HashMap<Category, GatePolicy>,
    force: bool,
}

impl RelevanceGate {
    pub fn new(rs: &Ruleset) -> Result<Self> {
        let policies = [
            Category::MeteorologicalAlert,
            Category::IncidentAlert,
            Category::News,
        ]
        .into_iter()
        .map(|c| (c, rs.gate.policy_for(c)))
        .collect();

        Ok(Self {
            exclude: compile_all("gate.exclude", &rs.gate.exclude)?,
            allow: compile_all("gate.allow_regions", &rs.gate.allow_regions)?,
            disallow: compile_all("gate.disallow_regions", &rs.gate.disallow_regions)?,
            watchlist: compile_all("watchlist", &rs.watchlist.patterns)?,
            publishers: Publishers::new(&rs.publishers),
            policies,
            force: rs.gate.force,
        })
    }

    /// Builder-style switch for the `force` run option.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn policy_for(&self, category: Category) -> GatePolicy {
        self.policies.get(&category).copied().unwrap_or_default()
    }

    /// `admit(text, link, category) -> bool`; `text` is title + summary.
    pub fn admit(&self, text: &str, link: &str, category: Category) -> bool {
        self.evaluate(text, link, category).admitted
    }

    /// Full evaluation with reasons (for logs and the debug API).
    pub fn evaluate(&self, text: &str, link: &str, category: Category) -> GateDecision {
        self.evaluate_with_force(text, link, category, false)
    }

    /// Like `evaluate`, with a per-run `force` on top of the ruleset's own switch.
    pub fn evaluate_with_force(
        &self,
        text: &str,
        link: &str,
        category: Category,
        force: bool,
    ) -> GateDecision {
        let decision = self.decide(text, link, category, self.force || force);
        let event = if decision.admitted {
            "admitted"
        } else {
            "rejected"
        };
        dev_log_gate(event, text, category, &decision.reasons);
        decision
    }

    fn decide(&self, text: &str, link: &str, category: Category, force: bool) -> GateDecision {
        // 1) Universal exclude dominates every other signal.
        if let Some(i) = first_match(&self.exclude, text) {
            return GateDecision::reject(format!("exclude:#{i}"));
        }

        // 2) Forced runs skip the regional policy.
        if force {
            return GateDecision::admit(vec!["force".into()]);
        }

        let allow = first_match(&self.allow, text).is_some();
        let disallow = first_match(&self.disallow, text).is_some();
        let watch = first_match(&self.watchlist, text).is_some();

        match self.policy_for(category) {
            GatePolicy::Loose => {
                if allow {
                    GateDecision::admit(vec!["region:allow".into()])
                } else if disallow {
                    GateDecision::reject("region:disallow".into())
                } else {
                    GateDecision::admit(vec!["loose:default".into()])
                }
            }
            GatePolicy::Strict => {
                let mut reasons = Vec::new();
                if allow {
                    reasons.push("region:allow".to_string());
                }
                if watch {
                    reasons.push("watchlist".to_string());
                }
                if disallow {
                    // Only textual evidence may override an explicit out-of-region token.
                    return if reasons.is_empty() {
                        GateDecision::reject("region:disallow".into())
                    } else {
                        reasons.push("override:region:disallow".into());
                        GateDecision::admit(reasons)
                    };
                }
                if let Some(ev) = self.publishers.regional_evidence(link) {
                    reasons.push(match ev {
                        SourceEvidence::Domain(d) => format!("source:domain:{d}"),
                        SourceEvidence::Tld(t) => format!("source:tld:{t}"),
                    });
                }
                if reasons.is_empty() {
                    GateDecision::reject("strict:no_regional_evidence".into())
                } else {
                    GateDecision::admit(reasons)
                }
            }
        }
    }
}

fn first_match(set: &[Regex], text: &str) -> Option<usize> {
    set.iter().position(|re| re.is_match(text))
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> RelevanceGate {
        let rs = Ruleset::builtin().expect("builtin ruleset");
        RelevanceGate::new(&rs).expect("gate")
    }

    const NEWS: Category = Category::News;
    const LINK: &str = "https://example.com/story";

    #[test]
    fn noise_dominates_incident_and_region() {
        let g = gate();
        let d = g.evaluate(
            "Football fans riot in Paris after match, explosion near stadium in France",
            "https://www.bbc.co.uk/news/x",
            NEWS,
        );
        assert!(!d.admitted);
        assert!(d.reasons[0].starts_with("exclude:"), "{:?}", d.reasons);
    }

    #[test]
    fn transfer_news_is_excluded() {
        let g = gate();
        assert!(!g.admit(
            "Transfer news: football club signs new striker",
            LINK,
            NEWS
        ));
    }

    #[test]
    fn strict_requires_positive_evidence() {
        let g = gate();
        assert!(!g.admit("Explosion rocks central station", LINK, NEWS));
        assert!(g.admit("Explosion rocks central station in Germany", LINK, NEWS));
        assert!(g.admit("Explosion rocks station in Brussels", LINK, NEWS));
        assert!(g.admit(
            "Explosion rocks central station",
            "https://www.lemonde.fr/a",
            NEWS
        ));
    }

    #[test]
    fn strict_disallow_overridden_by_text_evidence_only() {
        let g = gate();
        // Source identity alone cannot override an out-of-region token.
        assert!(!g.admit(
            "Protests spread across Canada",
            "https://www.bbc.co.uk/news/x",
            NEWS
        ));
        // Watchlist evidence can.
        assert!(g.admit("Canada and UK leaders meet in London", LINK, NEWS));
    }

    #[test]
    fn strict_disallow_overridden_by_allow_region_alone() {
        let g = gate();
        let d = g.evaluate("Canada and France sign defence pact", LINK, NEWS);
        assert!(d.admitted, "{:?}", d.reasons);
        assert_eq!(d.reasons, vec!["region:allow", "override:region:disallow"]);
    }

    #[test]
    fn strict_disallow_overridden_by_watchlist_alone() {
        let g = gate();
        let d = g.evaluate("Canada sends investigators to Heathrow", LINK, NEWS);
        assert!(d.admitted, "{:?}", d.reasons);
        assert_eq!(d.reasons, vec!["watchlist", "override:region:disallow"]);
    }

    #[test]
    fn loose_policy_for_alert_categories() {
        let g = gate();
        let met = Category::MeteorologicalAlert;
        assert_eq!(g.policy_for(met), GatePolicy::Loose);
        assert!(g.admit("Amber warning for wind", LINK, met));
        assert!(!g.admit("Severe storm warning for Texas, United States", LINK, met));
        assert!(g.admit(
            "Storm warning for Ireland and the United States coast",
            LINK,
            met
        ));
    }

    #[test]
    fn force_skips_region_but_not_exclude() {
        let g = gate().with_force(true);
        assert!(g.admit("Explosion rocks central station", LINK, NEWS));
        assert!(g.admit("Protests spread across Canada", LINK, NEWS));
        assert!(!g.admit("Tennis final delayed by protest", LINK, NEWS));
    }

    #[test]
    fn per_run_force_matches_ruleset_force() {
        let g = gate();
        let d = g.evaluate_with_force("Explosion rocks central station", LINK, NEWS, true);
        assert!(d.admitted);
        assert_eq!(d.reasons, vec!["force".to_string()]);
        assert!(!g.admit("Explosion rocks central station", LINK, NEWS));
    }

    #[test]
    fn anon_hash_is_stable_and_short() {
        assert_eq!(anon_hash("abc"), anon_hash("abc"));
        assert_eq!(anon_hash("abc").len(), 12);
        assert_ne!(anon_hash("abc"), anon_hash("abd"));
    }
}
