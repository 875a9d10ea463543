// src/feed.rs
//! Output items and RSS 2.0 rendering.
//!
//! Titles carry a priority/score marker when scores are public, the plain title
//! otherwise. Descriptions are `Source:`-prefixed, HTML-escaped and capped at
//! 2000 characters.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AssembledItem, Category, Priority};

pub const MAX_DESCRIPTION_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleStyle {
    /// `🚨 [P1 · 215] title` for urgent items, `[P2 · 90] title` otherwise.
    #[default]
    Public,
    Hidden,
}

/// Channel-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Default for ChannelMeta {
    fn default() -> Self {
        Self {
            title: "EMEA SOC Filtered Feed".into(),
            link: "https://example.org/emea-filtered".into(),
            description: "Merged & filtered EMEA alerts (security, unrest, weather, transport)"
                .into(),
        }
    }
}

/// One output entry, as rendered into RSS or returned by `/classify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub category: Category,
    pub priority: Priority,
    pub score: u32,
    pub urgent: bool,
}

pub fn display_title(a: &AssembledItem, style: TitleStyle) -> String {
    let it = &a.item;
    match style {
        TitleStyle::Hidden => it.title.clone(),
        TitleStyle::Public => {
            let marker = format!("[{} · {}]", it.priority.label(), it.score);
            if it.urgent {
                format!("🚨 {marker} {}", it.title)
            } else {
                format!("{marker} {}", it.title)
            }
        }
    }
}

pub fn description(source: &str, summary: &str) -> String {
    let body = html_escape::encode_text(summary);
    let desc = if source.trim().is_empty() {
        body.into_owned()
    } else {
        format!(
            "<b>Source:</b> {}<br/>{}",
            html_escape::encode_text(source.trim()),
            body
        )
    };
    truncate_chars(&desc, MAX_DESCRIPTION_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

pub fn build_feed_item(a: &AssembledItem, style: TitleStyle) -> FeedItem {
    FeedItem {
        id: a.id.clone(),
        title: display_title(a, style),
        link: a.item.link.clone(),
        description: description(&a.item.source, &a.item.summary),
        published_at: a.item.published_at,
        category: a.item.category,
        priority: a.item.priority,
        score: a.item.score,
        urgent: a.item.urgent,
    }
}

pub fn build_feed_items(items: &[AssembledItem], style: TitleStyle) -> Vec<FeedItem> {
    items.iter().map(|a| build_feed_item(a, style)).collect()
}

/* ----------------------------
RSS 2.0 (quick-xml serde)
---------------------------- */

#[derive(Serialize)]
#[serde(rename = "rss")]
struct Rss<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    channel: Channel<'a>,
}

#[derive(Serialize)]
struct Channel<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    language: &'static str,
    #[serde(rename = "lastBuildDate")]
    last_build_date: String,
    #[serde(rename = "item")]
    items: Vec<RssItem<'a>>,
}

#[derive(Serialize)]
struct RssItem<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    guid: Guid<'a>,
    #[serde(rename = "pubDate")]
    pub_date: String,
}

#[derive(Serialize)]
struct Guid<'a> {
    #[serde(rename = "@isPermaLink")]
    is_perma_link: &'static str,
    #[serde(rename = "$text")]
    value: &'a str,
}

/// Render a complete RSS 2.0 document (with XML declaration).
pub fn render_rss(meta: &ChannelMeta, items: &[FeedItem], now: DateTime<Utc>) -> Result<String> {
    let doc = Rss {
        version: "2.0",
        channel: Channel {
            title: &meta.title,
            link: &meta.link,
            description: &meta.description,
            language: "en",
            last_build_date: now.to_rfc2822(),
            items: items
                .iter()
                .map(|f| RssItem {
                    title: &f.title,
                    link: &f.link,
                    description: &f.description,
                    guid: Guid {
                        is_perma_link: "false",
                        value: &f.id,
                    },
                    pub_date: f.published_at.to_rfc2822(),
                })
                .collect(),
        },
    };
    let body = quick_xml::se::to_string(&doc).context("serializing rss")?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}
