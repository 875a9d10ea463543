//! # Publishers
//!
//! Source identity heuristics shared by the relevance gate and the scoring engine:
//!
//! - Trusted publisher lookup by source name (aliases → exact → whole-word containment).
//! - Publisher domain match on the entry link (`bbc.co.uk`, `gov.uk`, ...).
//! - Country top-level domain allow-list (`.fr`, `.de`, `.co.uk` → `uk`, ...).
//!
//! Name matching is case-insensitive and tolerant of punctuation, dashes and
//! typographic quotes.

use std::collections::{HashMap, HashSet};

use crate::ruleset::PublishersCfg;

/// Why a link counts as regional evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvidence {
    Domain(String),
    Tld(String),
}

#[derive(Debug, Clone)]
pub struct Publishers {
    trusted: HashSet<String>,
    aliases: HashMap<String, String>,
    trusted_domains: Vec<String>,
    allowed_tlds: HashSet<String>,
    bonus: u32,
}

impl Publishers {
    pub fn new(cfg: &PublishersCfg) -> Self {
        Self {
            trusted: cfg.trusted.iter().map(|s| normalize(s)).collect(),
            aliases: cfg
                .aliases
                .iter()
                .map(|(a, c)| (normalize(a), normalize(c)))
                .collect(),
            trusted_domains: cfg
                .trusted_domains
                .iter()
                .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            allowed_tlds: cfg
                .allowed_tlds
                .iter()
                .map(|t| t.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            bonus: cfg.bonus,
        }
    }

    /// Resolve a source name to its canonical trusted publisher.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical, if that canonical is trusted.
    /// 2. Exact match.
    /// 3. Whole-word containment (e.g. "BBC News - Europe" → "bbc").
    pub fn canonical(&self, source: &str) -> Option<String> {
        let s = normalize(source);
        if s.is_empty() {
            return None;
        }

        // 1) Alias resolution.
        if let Some(canon) = self.aliases.get(&s) {
            if self.trusted.contains(canon) {
                return Some(canon.clone());
            }
        }

        // 2) Exact match.
        if self.trusted.contains(&s) {
            return Some(s);
        }

        // 3) Whole-word containment; longest key wins so results don't depend on set order.
        let padded = format!(" {s} ");
        self.trusted
            .iter()
            .filter(|k| padded.contains(&format!(" {k} ")))
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .cloned()
    }

    /// Domain on the trusted list, matched on the host or any parent domain.
    pub fn trusted_domain(&self, link: &str) -> Option<String> {
        let host = link_host(link)?;
        self.trusted_domains
            .iter()
            .find(|d| host == **d || host.ends_with(&format!(".{d}")))
            .cloned()
    }

    /// Link-based regional evidence used by the strict gate policy.
    pub fn regional_evidence(&self, link: &str) -> Option<SourceEvidence> {
        if let Some(d) = self.trusted_domain(link) {
            return Some(SourceEvidence::Domain(d));
        }
        let host = link_host(link)?;
        let tld = host.rsplit('.').next()?.to_string();
        if self.allowed_tlds.contains(&tld) {
            return Some(SourceEvidence::Tld(tld));
        }
        None
    }

    /// Fixed bonus when either the source name or the link domain is trusted.
    pub fn trust_bonus(&self, source: &str, link: &str) -> u32 {
        if self.canonical(source).is_some() || self.trusted_domain(link).is_some() {
            self.bonus
        } else {
            0
        }
    }
}

/// Lower-cased host of an absolute URL, without a trailing dot.
pub fn link_host(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link.trim()).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_lowercase();

    // Replace common separators with spaces.
    for ch in ['—', '–', '-', '_', '/', '\\', '|', ':'] {
        out = out.replace(ch, " ");
    }

    // Replace disruptive punctuation/whitespace with spaces.
    out = out.replace(['\n', '\r', '\t', '.', ',', '‚', '’', '\'', '(', ')'], " ");

    // Collapse multiple spaces.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
