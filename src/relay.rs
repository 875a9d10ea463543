// src/relay.rs
//! One relay run end to end: fetch → classify → output items → RSS.
//! Shared by the HTTP service and the `relay-once` binary.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::feed::{build_feed_items, render_rss, FeedItem};
use crate::ingest::{config::build_sources, run_once, ConfiguredSource};
use crate::pipeline::{Classifier, ClassifierHandle, RunStats};

#[derive(Clone)]
pub struct Relay {
    pub config: Arc<RelayConfig>,
    pub classifier: ClassifierHandle,
    pub sources: Arc<Vec<ConfiguredSource>>,
}

/// Result of one run, before rendering.
#[derive(Debug, Clone, Default)]
pub struct RelayRun {
    pub items: Vec<FeedItem>,
    pub stats: RunStats,
    pub failed_sources: Vec<String>,
}

impl Relay {
    /// Compile the ruleset and instantiate the providers of the selected tiers.
    /// Fails on a malformed ruleset or an unknown tier.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let ruleset = config.load_ruleset()?;
        let classifier = Classifier::new(&ruleset)?;
        let selected = config.selected_sources()?;
        let sources = build_sources(&selected, config.source_timeout());
        Ok(Self::new(config, classifier, sources))
    }

    pub fn new(config: RelayConfig, classifier: Classifier, sources: Vec<ConfiguredSource>) -> Self {
        Self {
            config: Arc::new(config),
            classifier: ClassifierHandle::new(classifier),
            sources: Arc::new(sources),
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> RelayRun {
        let report = run_once(&self.sources).await;
        let classifier = self.classifier.current();
        let out = classifier.run(&report.batches, &self.config.run_options(), now);
        RelayRun {
            items: build_feed_items(&out.items, self.config.title_style()),
            stats: out.stats,
            failed_sources: report.failed,
        }
    }

    /// Run and render the RSS document.
    pub async fn render_feed(&self, now: DateTime<Utc>) -> Result<(String, RelayRun)> {
        let run = self.run(now).await;
        let xml = render_rss(&self.config.feed, &run.items, now)?;
        Ok((xml, run))
    }
}
