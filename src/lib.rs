// src/lib.rs
// Public library surface for the service, the one-shot binary and integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod publishers;
pub mod relay;
pub mod relevance;
pub mod replay;
pub mod ruleset;

// Scoring, priority and dedup stages
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::model::{AssembledItem, Category, Priority, RawEntry, ScoredItem};
pub use crate::pipeline::{Classifier, ClassifierHandle, ItemContext, RunOptions, SourceBatch};
pub use crate::ruleset::Ruleset;
