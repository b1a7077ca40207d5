//! VULCA Evaluation Engine
//!
//! Aggregation and comparison of multi-dimensional creative evaluations:
//! - 47-dimension registry grouped under 6 categories, 8 cultural perspectives
//! - 6D/47D expansion and aggregation with provenance tracking
//! - Variance ranking, pairwise comparison, leaderboard
//! - Chart selection for the visualization layer
//! - TTL result cache with session fallback in front of the evaluation API

pub mod analysis;
pub mod cache;
pub mod client;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod export;
pub mod scoring;
pub mod service;
pub mod viz;

// Re-exports for convenience
pub use analysis::{compare, rank_dimensions, select_dimensions, ComparisonResult, FilterMode};
pub use config::EngineConfig;
pub use dimensions::{Category, CulturalPerspective, DimensionKey};
pub use error::{EngineError, EngineResult, FetchError};
pub use export::ExportBundle;
pub use scoring::{normalize, EvaluationRecord};
pub use service::{ComparisonReport, EvaluationService};
pub use viz::{select_chart, ViewMode, VisualizationDecision};
