//! Quantity extraction: "N killed", "N injured", "N arrested".
//!
//! Each rule contributes once, from the largest number it finds:
//! `min(cap, max(floor, n * multiplier))`. Numbers that do not parse are skipped
//! without affecting the rest of scoring.

use anyhow::{bail, Result};
use regex::Regex;

use crate::ruleset::{compile_pattern, QuantityCfg};

#[derive(Debug)]
struct QuantityRule {
    name: String,
    re: Regex,
    multiplier: u32,
    floor: u32,
    cap: u32,
}

/// One scored quantity phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityHit {
    pub name: String,
    pub count: u64,
    pub points: u32,
}

#[derive(Debug, Default)]
pub struct QuantityExtractor {
    rules: Vec<QuantityRule>,
}

impl QuantityExtractor {
    pub fn new(cfgs: &[QuantityCfg]) -> Result<Self> {
        let mut rules = Vec::with_capacity(cfgs.len());
        for q in cfgs {
            let re = compile_pattern("quantity", &q.name, &q.pattern)?;
            if !re.capture_names().any(|n| n == Some("n")) {
                bail!("quantity `{}` pattern has no `(?P<n>...)` group", q.name);
            }
            rules.push(QuantityRule {
                name: q.name.clone(),
                re,
                multiplier: q.multiplier,
                floor: q.floor,
                cap: q.cap,
            });
        }
        Ok(Self { rules })
    }

    /// Evaluate every rule against `text`, in ruleset order.
    pub fn extract(&self, text: &str) -> Vec<QuantityHit> {
        let mut out = Vec::new();
        for rule in &self.rules {
            let best = rule
                .re
                .captures_iter(text)
                .filter_map(|caps| caps.name("n").and_then(|m| parse_quantity(m.as_str())))
                .max();
            if let Some(count) = best {
                out.push(QuantityHit {
                    name: rule.name.clone(),
                    count,
                    points: rule.points(count),
                });
            }
        }
        out
    }
}

impl QuantityRule {
    fn points(&self, count: u64) -> u32 {
        let raw = count.saturating_mul(u64::from(self.multiplier));
        let bounded = raw.max(u64::from(self.floor)).min(u64::from(self.cap));
        u32::try_from(bounded).unwrap_or(self.cap)
    }
}

/// Digits (with thousands separators) or a small set of count words.
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let t = raw.trim().to_lowercase();
    if t.starts_with(|c: char| c.is_ascii_digit()) {
        let cleaned: String = t.chars().filter(|c| *c != ',').collect();
        return cleaned.parse::<u64>().ok();
    }
    let n = match t.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" | "a dozen" => 12,
        "twenty" => 20,
        "dozens" => 24,
        "scores" => 40,
        "hundreds" => 200,
        "thousands" => 2000,
        _ => return None,
    };
    Some(n)
}
