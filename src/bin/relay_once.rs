//! One-shot relay: fetch the configured sources, classify, write the RSS file.
//!
//! Configuration comes from `config/relay.toml` and `RELAY_*` variables (a `.env`
//! file is honoured); command-line flags override both. See `--help`.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use emea_feed_relay::{cli::RelayOnceArgs, config::RelayConfig, relay::Relay};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = RelayOnceArgs::parse();
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact().with_target(false))
        .init();

    let mut config = RelayConfig::load()?;
    args.apply(&mut config)?;
    let output = config.output.path.clone();
    let relay = Relay::from_config(config)?;

    let (xml, run) = relay.render_feed(Utc::now()).await?;
    tokio::fs::write(&output, xml)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        items = run.items.len(),
        failed_sources = run.failed_sources.len(),
        output = %output.display(),
        "wrote feed"
    );
    println!("Wrote {} items to {}", run.items.len(), output.display());
    Ok(())
}
