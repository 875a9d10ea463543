//! EMEA Feed Relay HTTP service entrypoint.
//! Boots the Axum server with the compiled classifier, configured sources and metrics.

use emea_feed_relay::{
    api, config::RelayConfig, metrics::Metrics, pipeline::start_hot_reload_thread, relay::Relay,
};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - RELAY_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("RELAY_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("relevance=info,pipeline=info,ingest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    // A malformed ruleset or unknown tier stops startup here.
    let config = RelayConfig::load()?;
    let ruleset_path = config.ruleset_path();
    let relay = Relay::from_config(config)?;

    // If hot reload is enabled, spawn background watcher
    start_hot_reload_thread(relay.classifier.clone(), ruleset_path);

    let version = relay.classifier.current().version().to_string();
    let mut router = api::create_router(relay);
    match Metrics::init(&version) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
