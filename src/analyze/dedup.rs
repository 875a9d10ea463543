//! Exact and near-duplicate suppression over scored items.
//!
//! Items are ranked first (priority, score, publish time, all descending) so the
//! survivor of each duplicate group is always the best-ranked copy.
//!
//! - Exact key: SHA-256 of the whitespace-folded, lower-cased title plus the link.
//! - Near key: title with wire prefixes, trailing parentheticals, punctuation and
//!   generic suffix words removed. Equal near keys collapse; otherwise a
//!   similarity ratio at or above the threshold collapses.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::model::ScoredItem;
use crate::ruleset::{DedupCfg, SimilarityMetric};

static WIRE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(breaking( news)?|update[ds]?|live|exclusive|watch|just in|developing|urgent|alert)(\s*[:|]\s*|\s+[-–—]\s+)",
    )
    .expect("static regex")
});

static TRAILING_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[(\[][^()\[\]]*[)\]]\s*$").expect("static regex"));

const SUFFIX_WORDS: &[&str] = &[
    "report", "reports", "update", "updates", "live", "latest", "video", "photos",
];

/// Hex SHA-256 of the normalized title and the link.
pub fn exact_key(title: &str, link: &str) -> String {
    let folded = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(folded.as_bytes());
    hasher.update(b"|");
    hasher.update(link.trim().as_bytes());
    hex(&hasher.finalize())
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Near-duplicate key for a title. May be empty for titles made only of noise.
pub fn near_dup_key(title: &str) -> String {
    let mut s = title.trim().to_lowercase();

    // Wire prefixes can stack ("UPDATE: BREAKING: ...").
    loop {
        let stripped = WIRE_PREFIX.replace(&s, "").into_owned();
        if stripped == s {
            break;
        }
        s = stripped;
    }
    s = TRAILING_PAREN.replace(&s, "").into_owned();

    let cleaned: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| SUFFIX_WORDS.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`, in `[0, 1]`.
pub fn ratcliff_obershelp(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (i, j, k) = longest_common_run(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + k..], &b[j + k..])
}

/// Earliest longest common substring as `(start_a, start_b, len)`.
fn longest_common_run(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            curr[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let run = curr[j + 1];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

/// Counts of what was dropped alongside the survivors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    pub kept: Vec<ScoredItem>,
    pub exact_dupes: usize,
    pub near_dupes: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    threshold: f64,
    metric: SimilarityMetric,
}

impl Deduplicator {
    pub fn new(cfg: &DedupCfg) -> Self {
        Self {
            threshold: cfg.similarity_threshold.clamp(0.0, 1.0),
            metric: cfg.metric,
        }
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match self.metric {
            SimilarityMetric::RatcliffObershelp => ratcliff_obershelp(a, b),
            SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(a, b),
        }
    }

    /// Rank, then keep the first item of every exact or near-duplicate group.
    pub fn dedupe(&self, mut items: Vec<ScoredItem>) -> DedupOutcome {
        // Stable sort: equal keys keep arrival order.
        items.sort_by(|a, b| b.rank_key().cmp(&a.rank_key()));

        let mut out = DedupOutcome::default();
        let mut seen_exact: HashSet<String> = HashSet::new();
        let mut seen_near: HashSet<String> = HashSet::new();
        let mut kept_near: Vec<String> = Vec::new();

        for item in items {
            let ek = exact_key(&item.title, &item.link);
            if seen_exact.contains(&ek) {
                out.exact_dupes += 1;
                continue;
            }

            let nk = near_dup_key(&item.title);
            if !nk.is_empty() {
                let near = seen_near.contains(&nk)
                    || kept_near
                        .iter()
                        .any(|k| self.similarity(&nk, k) >= self.threshold);
                if near {
                    out.near_dupes += 1;
                    continue;
                }
                seen_near.insert(nk.clone());
                kept_near.push(nk);
            }

            seen_exact.insert(ek);
            out.kept.push(item);
        }
        out
    }
}
