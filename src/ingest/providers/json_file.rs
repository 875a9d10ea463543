// src/ingest/providers/json_file.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use std::path::PathBuf;

use crate::ingest::types::{parse_payload, SourceProvider};
use crate::model::{Category, RawEntry};

/// Reads a JSON payload from disk on every fetch (fixtures, locally mirrored feeds).
pub struct JsonFileProvider {
    name: String,
    path: PathBuf,
    category: Category,
}

impl JsonFileProvider {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            category,
        }
    }
}

#[async_trait]
impl SourceProvider for JsonFileProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>> {
        let t0 = std::time::Instant::now();
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        let out = parse_payload(&self.name, &body, self.category)?;

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_fixture_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"[{{"title":"Port closed in Dover","link":"https://a.test/1"}}]"#
        )
        .unwrap();
        let p = JsonFileProvider::new("Dover Port", f.path(), Category::IncidentAlert);
        let v = p.fetch_latest().await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].source, "Dover Port");
        assert_eq!(p.name(), "Dover Port");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let p = JsonFileProvider::new("Gone", "/nonexistent/feed.json", Category::News);
        assert!(p.fetch_latest().await.is_err());
    }
}
