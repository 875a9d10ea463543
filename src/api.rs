use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shuttle_axum::axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::feed::{build_feed_items, FeedItem};
use crate::model::RawEntry;
use crate::pipeline::{ItemContext, RunStats, SourceBatch};
use crate::relay::Relay;
use crate::ruleset::{DedupCfg, GatePolicy, ThresholdsCfg};

pub fn create_router(relay: Relay) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feed.xml", get(feed_xml))
        .route("/classify", post(classify))
        .route("/debug/ruleset", get(debug_ruleset))
        .layer(CorsLayer::very_permissive())
        .with_state(relay)
}

async fn feed_xml(State(relay): State<Relay>) -> Response {
    match relay.render_feed(Utc::now()).await {
        Ok((xml, _run)) => (
            [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
            xml,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(target: "pipeline", error = %e, "feed render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "feed render failed").into_response()
        }
    }
}

#[derive(Deserialize)]
struct ClassifyReq {
    entries: Vec<RawEntry>,
    /// Fixed clock for reproducible previews; defaults to the server time.
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ClassifyResp {
    ruleset_version: String,
    stats: RunStats,
    items: Vec<FeedItem>,
}

/// Stateless preview: classify the posted entries with the live ruleset and run options.
async fn classify(State(relay): State<Relay>, Json(body): Json<ClassifyReq>) -> Json<ClassifyResp> {
    let now = body.now.unwrap_or_else(Utc::now);
    let classifier = relay.classifier.current();

    // One batch per entry keeps the posted order; each entry carries its own category.
    let batches: Vec<SourceBatch> = body
        .entries
        .into_iter()
        .map(|e| SourceBatch {
            context: ItemContext::new(e.category, String::new()),
            entries: vec![e],
        })
        .collect();

    let out = classifier.run(&batches, &relay.config.run_options(), now);
    Json(ClassifyResp {
        ruleset_version: classifier.version().to_string(),
        stats: out.stats,
        items: build_feed_items(&out.items, relay.config.title_style()),
    })
}

#[derive(Serialize)]
struct SignalOut {
    name: String,
    category: String,
    weight: u32,
}

#[derive(Serialize)]
struct RulesetOut {
    version: String,
    thresholds: ThresholdsCfg,
    gate_policy: GatePolicy,
    signals: Vec<SignalOut>,
    watchlist_bonus: u32,
    dedup: DedupCfg,
}

async fn debug_ruleset(State(relay): State<Relay>) -> Json<RulesetOut> {
    let classifier = relay.classifier.current();
    let rs = classifier.ruleset();
    Json(RulesetOut {
        version: rs.version.clone(),
        thresholds: rs.thresholds,
        gate_policy: rs.gate.policy,
        signals: rs
            .signals
            .iter()
            .map(|s| SignalOut {
                name: s.name.clone(),
                category: s.category.clone(),
                weight: s.weight,
            })
            .collect(),
        watchlist_bonus: rs.watchlist.bonus,
        dedup: rs.dedup,
    })
}
