// src/analyze/mod.rs
//! Scoring, priority and dedup stages that run after the relevance gate.

pub mod dedup;
pub mod priority;
pub mod quantity;
pub mod scoring;
pub mod severity;

// Re-export convenient types.
pub use crate::analyze::dedup::{exact_key, near_dup_key, DedupOutcome, Deduplicator};
pub use crate::analyze::priority::PriorityClassifier;
pub use crate::analyze::scoring::{Score, ScoreInputs, ScoringEngine};
pub use crate::analyze::severity::{SeverityAssessment, SeverityTier};
