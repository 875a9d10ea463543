// src/ingest/providers/http_json.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};

use crate::ingest::types::{parse_payload, SourceProvider};
use crate::model::{Category, RawEntry};

/// Fetches a JSON payload over HTTP. One attempt per run; no retry.
pub struct HttpJsonProvider {
    name: String,
    url: String,
    category: Category,
    client: reqwest::Client,
}

impl HttpJsonProvider {
    pub fn new(name: impl Into<String>, url: impl Into<String>, category: Category) -> Self {
        Self::with_client(name, url, category, reqwest::Client::new())
    }

    /// Share one client (connection pool) across providers.
    pub fn with_client(
        name: impl Into<String>,
        url: impl Into<String>,
        category: Category,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category,
            client,
        }
    }
}

#[async_trait]
impl SourceProvider for HttpJsonProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>> {
        let body = match self.client.get(&self.url).send().await {
            Ok(resp) => resp
                .error_for_status()
                .with_context(|| format!("{} http status", self.name))?
                .text()
                .await
                .with_context(|| format!("{} http .text()", self.name))?,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = %self.name, "provider http error");
                return Err(e).with_context(|| format!("{} http get()", self.name));
            }
        };

        let t0 = std::time::Instant::now();
        let out = parse_payload(&self.name, &body, self.category)?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
