//! Replay assembler: optional backfill rewrite of the top-ranked items.
//!
//! For rank `i < replay_count` the item is re-dated to `now - i * step` and gets a
//! seeded identifier, so a consumer that already saw the item treats it as new.
//! Membership and order never change.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::analyze::dedup::hex;
use crate::model::{AssembledItem, ScoredItem};

pub const DEFAULT_REPLAY_STEP_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayAssembler {
    count: usize,
    seed: String,
    step: Duration,
}

impl ReplayAssembler {
    pub fn new(count: usize, seed: impl Into<String>) -> Self {
        Self {
            count,
            seed: seed.into(),
            step: Duration::seconds(DEFAULT_REPLAY_STEP_SECS),
        }
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn assemble(&self, items: Vec<ScoredItem>, now: DateTime<Utc>) -> Vec<AssembledItem> {
        items
            .into_iter()
            .enumerate()
            .map(|(rank, mut item)| {
                if rank < self.count {
                    let offset = i32::try_from(rank)
                        .map(|r| self.step * r)
                        .unwrap_or(self.step * i32::MAX);
                    item.published_at = now - offset;
                    let id = item_id(&item.title, &item.link, Some(&self.seed));
                    AssembledItem {
                        item,
                        id,
                        replayed: true,
                    }
                } else {
                    let id = item_id(&item.title, &item.link, None);
                    AssembledItem {
                        item,
                        id,
                        replayed: false,
                    }
                }
            })
            .collect()
    }
}

/// `assemble(items, replay_count, seed, now)` with the default 60 s step.
pub fn assemble(
    items: Vec<ScoredItem>,
    replay_count: usize,
    seed: &str,
    now: DateTime<Utc>,
) -> Vec<AssembledItem> {
    ReplayAssembler::new(replay_count, seed).assemble(items, now)
}

/// Hex SHA-256 of `title|link`, or `title|link|seed` for replayed items.
pub fn item_id(title: &str, link: &str, seed: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(link.as_bytes());
    if let Some(seed) = seed {
        hasher.update(b"|");
        hasher.update(seed.as_bytes());
    }
    hex(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Priority};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 3, 12, 0, 0).unwrap()
    }

    fn items(n: usize) -> Vec<ScoredItem> {
        (0..n)
            .map(|i| ScoredItem {
                title: format!("Item {i}"),
                link: format!("https://a.test/{i}"),
                summary: String::new(),
                source: "wire".into(),
                category: Category::News,
                published_at: now() - Duration::days(2),
                score: 100,
                priority: Priority::P2,
                urgent: false,
                reasons: vec![],
            })
            .collect()
    }

    #[test]
    fn top_n_are_redated_in_descending_time() {
        let out = assemble(items(4), 3, "s1", now());
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].item.published_at, now());
        assert_eq!(out[1].item.published_at, now() - Duration::seconds(60));
        assert_eq!(out[2].item.published_at, now() - Duration::seconds(120));
        assert_eq!(out[3].item.published_at, now() - Duration::days(2));
        assert!(out[..3].iter().all(|a| a.replayed));
        assert!(!out[3].replayed);
    }

    #[test]
    fn order_and_membership_unchanged() {
        let out = assemble(items(5), 2, "s1", now());
        let titles: Vec<_> = out.iter().map(|a| a.item.title.clone()).collect();
        assert_eq!(titles, ["Item 0", "Item 1", "Item 2", "Item 3", "Item 4"]);
    }

    #[test]
    fn ids_stable_per_seed_and_differ_across_seeds() {
        let a = assemble(items(2), 1, "s1", now());
        let b = assemble(items(2), 1, "s1", now());
        let c = assemble(items(2), 1, "s2", now());
        assert_eq!(a[0].id, b[0].id);
        assert_ne!(a[0].id, c[0].id);
        // Non-replayed ids ignore the seed.
        assert_eq!(a[1].id, c[1].id);
        assert_eq!(a[1].id, item_id("Item 1", "https://a.test/1", None));
        assert_ne!(a[0].id, item_id("Item 0", "https://a.test/0", None));
    }

    #[test]
    fn zero_count_is_a_no_op_on_timestamps() {
        let out = assemble(items(3), 0, "s1", now());
        assert!(out.iter().all(|a| !a.replayed));
        assert!(out
            .iter()
            .all(|a| a.item.published_at == now() - Duration::days(2)));
    }

    #[test]
    fn custom_step() {
        let out = ReplayAssembler::new(2, "s")
            .with_step(Duration::minutes(5))
            .assemble(items(2), now());
        assert_eq!(out[1].item.published_at, now() - Duration::minutes(5));
    }
}
