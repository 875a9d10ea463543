// src/ingest/types.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::normalize_text;
use crate::model::{Category, RawEntry};

/// A source of already-parsed entries. Feed wire formats are handled upstream.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>>;
    fn name(&self) -> &str;
}

/// One entry as it appears in a provider's JSON payload. Field names follow the
/// common feed vocabulary; everything is optional at this layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "description")]
    pub summary: Option<String>,
    #[serde(default, alias = "pubDate", alias = "published_at", alias = "updated")]
    pub published: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Either a bare array or `{ "entries": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePayload {
    List(Vec<WireEntry>),
    Doc { entries: Vec<WireEntry> },
}

impl WireEntry {
    /// `None` when title or link is missing or blank after normalization.
    pub fn into_raw(self, source: &str, category: Category) -> Option<RawEntry> {
        let title = normalize_text(self.title.as_deref().unwrap_or_default());
        let link = self.link.unwrap_or_default().trim().to_string();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        let summary = normalize_text(self.summary.as_deref().unwrap_or_default());
        let source = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| source.to_string());
        Some(RawEntry {
            title,
            link,
            summary,
            published: self.published.as_deref().and_then(parse_published),
            source,
            category,
        })
    }
}

/// Parse a provider payload into raw entries, skipping incomplete ones.
pub fn parse_payload(provider: &str, body: &str, category: Category) -> Result<Vec<RawEntry>> {
    let payload: WirePayload = serde_json::from_str(body)
        .with_context(|| format!("parsing `{provider}` payload json"))?;
    let wire = match payload {
        WirePayload::List(v) => v,
        WirePayload::Doc { entries } => entries,
    };
    Ok(wire
        .into_iter()
        .filter_map(|w| w.into_raw(provider, category))
        .collect())
}

/// RFC 3339 or RFC 2822. Anything else is treated as missing.
pub fn parse_published(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let odt = OffsetDateTime::parse(ts, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc2822))
        .ok()?;
    DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_both_timestamp_styles() {
        let want = Utc.with_ymd_and_hms(2025, 10, 3, 10, 0, 0).unwrap();
        assert_eq!(parse_published("2025-10-03T12:00:00+02:00"), Some(want));
        assert_eq!(parse_published("Fri, 03 Oct 2025 10:00:00 +0000"), Some(want));
        assert_eq!(parse_published("yesterday"), None);
    }

    #[test]
    fn payload_shapes_and_skips() {
        let body = r#"{"entries": [
            {"title": "Strike halts trains in Lyon", "link": "https://a.test/1",
             "description": "<p>Unions &amp; rail</p>", "pubDate": "not a date"},
            {"title": "", "link": "https://a.test/2"},
            {"title": "No link"}
        ]}"#;
        let v = parse_payload("SNCF", body, Category::IncidentAlert).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].summary, "Unions & rail");
        assert_eq!(v[0].source, "SNCF");
        assert_eq!(v[0].published, None);
        assert_eq!(v[0].category, Category::IncidentAlert);

        let bare = r#"[{"title": "t", "link": "https://a.test/3", "source": "Wire"}]"#;
        let v = parse_payload("X", bare, Category::News).unwrap();
        assert_eq!(v[0].source, "Wire");
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_payload("X", "<rss/>", Category::News).is_err());
    }
}
