// src/pipeline.rs
//! Classification pipeline: gate → score → priority → dedup → cap → replay.
//!
//! `Classifier` is the compiled, immutable form of a `Ruleset`. It is shared through
//! `ClassifierHandle`, which can swap in a freshly compiled classifier (dev hot reload)
//! without touching the one in use.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

use crate::analyze::{
    DedupOutcome, Deduplicator, PriorityClassifier, ScoreInputs, ScoringEngine,
};
use crate::model::{AssembledItem, Category, Priority, RawEntry, ScoredItem};
use crate::relevance::RelevanceGate;
use crate::replay::{ReplayAssembler, DEFAULT_REPLAY_STEP_SECS};
use crate::ruleset::Ruleset;

pub const DEFAULT_MAX_ITEMS: usize = 250;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_entries_total", "Entries offered to the pipeline.");
        describe_counter!(
            "relay_dropped_total",
            "Entries dropped before output, labelled by reason."
        );
        describe_counter!("relay_emitted_total", "Items emitted after dedup and cap.");
        describe_histogram!("relay_run_ms", "Pipeline run time in milliseconds.");
    });
}

/* ----------------------------
Run inputs
---------------------------- */

/// Per-source context used to build items. Replaces one-off per-source closures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemContext {
    pub category: Category,
    /// Configured source name; falls back to the entry's own source when empty.
    pub source_label: String,
    /// Push-alert sources skip threshold classification.
    pub forced_priority: Option<Priority>,
}

impl ItemContext {
    pub fn new(category: Category, source_label: impl Into<String>) -> Self {
        Self {
            category,
            source_label: source_label.into(),
            forced_priority: None,
        }
    }

    pub fn with_forced_priority(mut self, p: Priority) -> Self {
        self.forced_priority = Some(p);
        self
    }
}

/// Entries of one source, in source order.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub context: ItemContext,
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub max_items: usize,
    /// 0 disables the age cutoff.
    pub since_hours: u32,
    pub replay_count: usize,
    pub replay_seed: String,
    pub replay_step: Duration,
    /// Bypass the regional policy (noise exclusion still applies).
    pub force: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            since_hours: 0,
            replay_count: 0,
            replay_seed: String::new(),
            replay_step: Duration::seconds(DEFAULT_REPLAY_STEP_SECS),
            force: false,
        }
    }
}

/// Why an entry did not become an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingField,
    Stale,
    Gate,
    SeverityVeto,
    BelowThreshold,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingField => "missing_field",
            DropReason::Stale => "stale",
            DropReason::Gate => "gate",
            DropReason::SeverityVeto => "severity_veto",
            DropReason::BelowThreshold => "below_threshold",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub seen: usize,
    pub missing_field: usize,
    pub stale: usize,
    pub gated: usize,
    pub vetoed: usize,
    pub below_threshold: usize,
    pub exact_dupes: usize,
    pub near_dupes: usize,
    pub capped: usize,
    pub emitted: usize,
}

impl RunStats {
    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingField => self.missing_field += 1,
            DropReason::Stale => self.stale += 1,
            DropReason::Gate => self.gated += 1,
            DropReason::SeverityVeto => self.vetoed += 1,
            DropReason::BelowThreshold => self.below_threshold += 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub items: Vec<AssembledItem>,
    pub stats: RunStats,
}

/* ----------------------------
Classifier
---------------------------- */

#[derive(Debug)]
pub struct Classifier {
    ruleset: Ruleset,
    gate: RelevanceGate,
    scorer: ScoringEngine,
    priority: PriorityClassifier,
    dedup: Deduplicator,
}

impl Classifier {
    pub fn new(rs: &Ruleset) -> Result<Self> {
        rs.validate()?;
        Ok(Self {
            ruleset: rs.clone(),
            gate: RelevanceGate::new(rs)?,
            scorer: ScoringEngine::new(rs)?,
            priority: PriorityClassifier::new(&rs.thresholds),
            dedup: Deduplicator::new(&rs.dedup),
        })
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub fn version(&self) -> &str {
        &self.ruleset.version
    }

    /// Single item-construction path for every source.
    pub fn build_item(
        &self,
        entry: &RawEntry,
        ctx: &ItemContext,
        now: DateTime<Utc>,
    ) -> Option<ScoredItem> {
        self.try_build(entry, ctx, now, false).ok()
    }

    fn try_build(
        &self,
        entry: &RawEntry,
        ctx: &ItemContext,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<ScoredItem, DropReason> {
        let title = entry.title.trim();
        let link = entry.link.trim();
        if title.is_empty() || link.is_empty() {
            return Err(DropReason::MissingField);
        }

        let source = if ctx.source_label.trim().is_empty() {
            entry.source.trim()
        } else {
            ctx.source_label.trim()
        };
        let published_at = entry.published.unwrap_or(now);
        let text = entry.joined_text();

        let decision = self
            .gate
            .evaluate_with_force(&text, link, ctx.category, force);
        if !decision.admitted {
            return Err(DropReason::Gate);
        }

        let score = self.scorer.score(
            &ScoreInputs {
                text: &text,
                category: ctx.category,
                published_at,
                source,
                link,
            },
            now,
        );
        if score.vetoed {
            return Err(DropReason::SeverityVeto);
        }

        let mut reasons = score.reasons;
        let priority = match ctx.forced_priority {
            Some(p) if p != Priority::None => {
                reasons.push(format!("forced:{}", p.label().to_ascii_lowercase()));
                p
            }
            _ => {
                if !self.priority.includes(score.value) {
                    return Err(DropReason::BelowThreshold);
                }
                self.priority.classify(score.value)
            }
        };

        Ok(ScoredItem {
            title: title.to_string(),
            link: link.to_string(),
            summary: entry.summary.trim().to_string(),
            source: source.to_string(),
            category: ctx.category,
            published_at,
            score: score.value,
            priority,
            urgent: score.urgent,
            reasons,
        })
    }

    /// Run the full pipeline over already-fetched batches. Deterministic for a given `now`.
    pub fn run(&self, batches: &[SourceBatch], opts: &RunOptions, now: DateTime<Utc>) -> RunOutput {
        ensure_metrics_described();
        let t0 = Instant::now();

        let cutoff = (opts.since_hours > 0).then(|| now - Duration::hours(i64::from(opts.since_hours)));
        let mut stats = RunStats::default();
        let mut collected = Vec::new();

        for batch in batches {
            for entry in &batch.entries {
                stats.seen += 1;
                let built = match cutoff {
                    Some(c) if entry.published.unwrap_or(now) < c => Err(DropReason::Stale),
                    _ => self.try_build(entry, &batch.context, now, opts.force),
                };
                match built {
                    Ok(item) => collected.push(item),
                    Err(reason) => {
                        stats.record(reason);
                        counter!("relay_dropped_total", "reason" => reason.as_str()).increment(1);
                    }
                }
            }
        }
        counter!("relay_entries_total").increment(stats.seen as u64);

        let DedupOutcome {
            mut kept,
            exact_dupes,
            near_dupes,
        } = self.dedup.dedupe(collected);
        stats.exact_dupes = exact_dupes;
        stats.near_dupes = near_dupes;
        counter!("relay_dropped_total", "reason" => "duplicate")
            .increment((exact_dupes + near_dupes) as u64);

        if kept.len() > opts.max_items {
            stats.capped = kept.len() - opts.max_items;
            kept.truncate(opts.max_items);
        }

        let items = ReplayAssembler::new(opts.replay_count, opts.replay_seed.clone())
            .with_step(opts.replay_step)
            .assemble(kept, now);
        stats.emitted = items.len();
        counter!("relay_emitted_total").increment(stats.emitted as u64);
        histogram!("relay_run_ms").record(t0.elapsed().as_secs_f64() * 1000.0);

        info!(
            target: "pipeline",
            version = %self.version(),
            seen = stats.seen,
            emitted = stats.emitted,
            gated = stats.gated,
            vetoed = stats.vetoed,
            below = stats.below_threshold,
            dupes = stats.exact_dupes + stats.near_dupes,
            "pipeline run complete"
        );

        RunOutput { items, stats }
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// A threadsafe handle whose classifier can be replaced wholesale in dev/local.
/// - Enable by setting RELAY_HOT_RELOAD=1
/// - Dev-gated: active only if cfg!(debug_assertions) OR SHUTTLE_ENV is "local"/"development".
#[derive(Clone, Debug)]
pub struct ClassifierHandle {
    inner: Arc<RwLock<Arc<Classifier>>>,
}

impl ClassifierHandle {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(classifier))),
        }
    }

    /// Snapshot of the classifier in use; unaffected by later swaps.
    pub fn current(&self) -> Arc<Classifier> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn swap(&self, classifier: Classifier) {
        let next = Arc::new(classifier);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var("RELAY_HOT_RELOAD")
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
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

/// Poll the ruleset file's mtime every 2s; recompile and swap on change.
/// An invalid edit keeps the previous classifier.
pub fn start_hot_reload_thread(handle: ClassifierHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = std::time::Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = match last_mtime {
                    None => {
                        last_mtime = Some(mtime);
                        false
                    }
                    Some(prev) => mtime > prev,
                };
                if changed {
                    match Ruleset::from_path(&path).and_then(|rs| Classifier::new(&rs)) {
                        Ok(next) => {
                            info!(target: "pipeline", version = %next.version(), "ruleset reloaded");
                            handle.swap(next);
                        }
                        Err(e) => warn!(target: "pipeline", error = %e, "ruleset reload rejected"),
                    }
                    last_mtime = Some(mtime);
                }
            } else {
                debug!(target: "pipeline", path = %path.display(), "ruleset not readable; retrying");
            }
            thread::sleep(poll);
        }
    });
}

/* ----------------------------
Tests
---------------------------- */
