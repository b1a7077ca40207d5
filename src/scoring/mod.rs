//! Scoring Module
//!
//! Score representations, evaluation records, and conversion between the
//! 6D summary and the 47D breakdown.

mod expansion;
mod types;

pub use expansion::{aggregate_to_6d, expand_to_47d, normalize, Aggregation, JITTER_BOUND};
pub use types::{
    clamp_score, CulturalScores, EvaluationRecord, Provenance, Score47D, Score6D, ScoreSource, MAX_SCORE,
    MIN_SCORE,
};
