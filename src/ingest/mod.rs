// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::ingest::types::SourceProvider;
use crate::model::RawEntry;
use crate::pipeline::{ItemContext, SourceBatch};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total entries parsed from providers.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors, timeouts included."
        );
        describe_counter!("ingest_provider_timeouts_total", "Provider fetches that timed out.");
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_histogram!("ingest_fetch_ms", "Provider fetch time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingest last ran.");
    });
}

/// Normalize text: decode entities, strip tags, straighten quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (nbsp included)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// A provider wired to its item context and fetch budget.
#[derive(Clone)]
pub struct ConfiguredSource {
    pub provider: Arc<dyn SourceProvider>,
    pub context: ItemContext,
    pub timeout: Duration,
}

/// What a run collected: batches in configured order, plus the sources that failed.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub batches: Vec<SourceBatch>,
    pub failed: Vec<String>,
}

enum FetchOutcome {
    Ok(Vec<RawEntry>),
    Failed(String),
    TimedOut,
}

/// Fetch every source concurrently. A failing, panicking or slow source is logged,
/// counted and skipped; it never affects the others.
pub async fn run_once(sources: &[ConfiguredSource]) -> FetchReport {
    ensure_metrics_described();

    let mut set = JoinSet::new();
    for (idx, src) in sources.iter().enumerate() {
        let provider = Arc::clone(&src.provider);
        let budget = src.timeout;
        set.spawn(async move {
            let t0 = Instant::now();
            let outcome = match tokio::time::timeout(budget, provider.fetch_latest()).await {
                Ok(Ok(entries)) => FetchOutcome::Ok(entries),
                Ok(Err(e)) => FetchOutcome::Failed(format!("{e:#}")),
                Err(_) => FetchOutcome::TimedOut,
            };
            histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            (idx, outcome)
        });
    }

    let mut slots: Vec<Option<Vec<RawEntry>>> = vec![None; sources.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, FetchOutcome::Ok(entries))) => slots[idx] = Some(entries),
            Ok((idx, FetchOutcome::Failed(err))) => {
                let name = sources[idx].provider.name();
                tracing::warn!(target: "ingest", error = %err, provider = %name, "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
            Ok((idx, FetchOutcome::TimedOut)) => {
                let name = sources[idx].provider.name();
                tracing::warn!(
                    target: "ingest",
                    provider = %name,
                    timeout_ms = sources[idx].timeout.as_millis() as u64,
                    "provider timed out"
                );
                counter!("ingest_provider_errors_total").increment(1);
                counter!("ingest_provider_timeouts_total").increment(1);
            }
            Err(e) => {
                // Panicked task; its index is unknown, the slot stays empty.
                tracing::warn!(target: "ingest", error = %e, "provider task aborted");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let mut report = FetchReport::default();
    for (idx, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(entries) => report.batches.push(SourceBatch {
                context: sources[idx].context.clone(),
                entries,
            }),
            None => report
                .failed
                .push(sources[idx].provider.name().to_string()),
        }
    }

    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    tracing::info!(
        target: "ingest",
        ok = report.batches.len(),
        failed = report.failed.len(),
        "ingest run complete"
    );
    report
}
