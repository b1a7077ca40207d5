//! Variance & Ranking
//!
//! Ranks the 47 dimensions by how strongly they separate a set of subjects,
//! and picks which of them deserve screen space.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use super::stats::summarize;
use crate::dimensions::{DimensionKey, DIMENSION_COUNT};
use crate::scoring::EvaluationRecord;

pub const HIGH_VARIANCE_COUNT: usize = 15;
pub const TOP_PERFORMANCE_COUNT: usize = 10;
/// Display cap for `FilterMode::All` in constrained rendering contexts
pub const ALL_DISPLAY_CAP: usize = 25;
pub const DEFAULT_CUSTOM_COUNT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionStats {
    pub dim: DimensionKey,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Subjects with a present value for this dimension
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    HighVariance,
    TopPerformance,
    All,
    Custom,
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high-variance" => Ok(FilterMode::HighVariance),
            "top-performance" => Ok(FilterMode::TopPerformance),
            "all" => Ok(FilterMode::All),
            "custom" => Ok(FilterMode::Custom),
            other => Err(format!("unknown filter mode '{}'", other)),
        }
    }
}

/// Per-dimension statistics across `records`, most discriminative first.
///
/// Only present values count. Dimensions with fewer than 2 values have
/// `std = 0` and sort after every dimension with a real spread; ties keep
/// registry order, so the result is deterministic.
pub fn rank_dimensions(records: &[EvaluationRecord]) -> Vec<DimensionStats> {
    let mut ranked: Vec<DimensionStats> = DimensionKey::all()
        .map(|dim| {
            let values: Vec<f64> = records.iter().filter_map(|r| r.dimension_value(dim)).collect();
            let s = summarize(&values);
            DimensionStats { dim, mean: s.mean, std: s.std, min: s.min, max: s.max, count: s.count }
        })
        .collect();

    ranked.sort_by(|a, b| {
        (b.count >= 2)
            .cmp(&(a.count >= 2))
            .then_with(|| b.std.total_cmp(&a.std))
            .then_with(|| a.dim.cmp(&b.dim))
    });
    ranked
}

fn by_mean_desc(a: &DimensionStats, b: &DimensionStats) -> Ordering {
    (b.count > 0)
        .cmp(&(a.count > 0))
        .then_with(|| b.mean.total_cmp(&a.mean))
        .then_with(|| a.dim.cmp(&b.dim))
}

/// Dimensions to display for a filter mode.
///
/// When no dimension has two or more values the variance ordering is
/// meaningless, so `HighVariance` and `Custom` order by mean instead.
pub fn select_dimensions(ranked: &[DimensionStats], mode: FilterMode, custom_count: Option<usize>) -> Vec<DimensionKey> {
    let variance_defined = ranked.iter().any(|s| s.count >= 2);

    let take_ordered = |n: usize, by_variance: bool| -> Vec<DimensionKey> {
        let mut ordered = ranked.to_vec();
        if !by_variance {
            ordered.sort_by(by_mean_desc);
        }
        ordered.into_iter().take(n).map(|s| s.dim).collect()
    };

    match mode {
        FilterMode::HighVariance => {
            if !variance_defined {
                debug!("variance undefined for fewer than 2 subjects, selecting by mean");
            }
            take_ordered(HIGH_VARIANCE_COUNT, variance_defined)
        }
        FilterMode::TopPerformance => take_ordered(TOP_PERFORMANCE_COUNT, false),
        FilterMode::All => DimensionKey::all().collect(),
        FilterMode::Custom => {
            let n = custom_count.unwrap_or(DEFAULT_CUSTOM_COUNT).clamp(1, DIMENSION_COUNT);
            take_ordered(n, variance_defined)
        }
    }
}

/// Truncate a selection to what a constrained view can draw.
pub fn cap_for_display(mut dims: Vec<DimensionKey>, cap: usize) -> Vec<DimensionKey> {
    dims.truncate(cap);
    dims
}
