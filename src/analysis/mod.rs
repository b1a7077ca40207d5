//! Analysis Module
//!
//! Statistics over normalized evaluation records: dimension ranking,
//! pairwise comparison and the overall leaderboard.

pub mod comparison;
mod leaderboard;
mod stats;
pub mod variance;

pub use comparison::{
    compare, compare_on, pairwise_difference, AxisStats, ComparisonBasis, ComparisonResult, CulturalSummary,
    PairDifference, ScoreAxis,
};
pub use leaderboard::{leaderboard, LeaderboardEntry};
pub use stats::{summarize, Summary};
pub use variance::{
    cap_for_display, rank_dimensions, select_dimensions, DimensionStats, FilterMode, ALL_DISPLAY_CAP,
    DEFAULT_CUSTOM_COUNT, HIGH_VARIANCE_COUNT, TOP_PERFORMANCE_COUNT,
};
