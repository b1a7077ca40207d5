//! Chart selection
//!
//! Pure decision over cardinalities only; cheap enough to recompute on
//! every input change, so nothing here is cached.

use serde::{Deserialize, Serialize};

/// Above this many axes radar and parallel-coordinate charts stop being legible
pub const MAX_RADAR_AXES: usize = 12;
/// Subject count at which parallel coordinates beat a radar
pub const PARALLEL_MIN_SUBJECTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ViewMode {
    #[default]
    #[serde(rename = "6d")]
    SixD,
    #[serde(rename = "47d")]
    FortySevenD,
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "6d" => Ok(ViewMode::SixD),
            "47d" => Ok(ViewMode::FortySevenD),
            other => Err(format!("unknown view mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::SixD => write!(f, "6d"),
            ViewMode::FortySevenD => write!(f, "47d"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewLevel {
    #[default]
    Overview,
    Grouped,
    Detailed,
}

impl std::str::FromStr for ViewLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overview" => Ok(ViewLevel::Overview),
            "grouped" => Ok(ViewLevel::Grouped),
            "detailed" => Ok(ViewLevel::Detailed),
            other => Err(format!("unknown view level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    Radar,
    /// One card per parent category rather than a single chart
    GroupedCards,
    /// Horizontal bars
    Bar,
    ParallelCoordinates,
}

/// Which axes the chosen chart should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "count")]
pub enum DimensionSubset {
    /// The 6 categories
    Categories,
    /// Every dimension, grouped under its category
    ByCategory,
    /// The first `n` dimensions of the active selection
    Leading(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub view_mode: ViewMode,
    pub view_level: ViewLevel,
    pub subject_count: usize,
    pub dimension_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationDecision {
    pub chart_type: ChartType,
    pub dimension_subset: DimensionSubset,
    pub rationale: String,
}

impl VisualizationDecision {
    fn new(chart_type: ChartType, dimension_subset: DimensionSubset, rationale: &str) -> Self {
        Self { chart_type, dimension_subset, rationale: rationale.to_string() }
    }
}

/// Pick a chart for the current view. Total over all inputs.
pub fn select_chart(request: &ChartRequest) -> VisualizationDecision {
    use ChartType::*;

    match (request.view_mode, request.view_level) {
        (ViewMode::SixD, _) => VisualizationDecision::new(
            Radar,
            DimensionSubset::Categories,
            "fixed 6-axis layout is always legible",
        ),
        (ViewMode::FortySevenD, ViewLevel::Grouped) => VisualizationDecision::new(
            GroupedCards,
            DimensionSubset::ByCategory,
            "47 raw points are illegible together; grouping by the 6 parent categories restores legibility",
        ),
        (ViewMode::FortySevenD, ViewLevel::Detailed) => {
            let subset = DimensionSubset::Leading(request.dimension_count);
            if request.dimension_count > MAX_RADAR_AXES {
                VisualizationDecision::new(
                    Bar,
                    subset,
                    "radar and parallel axes become unreadable past 12 dimensions",
                )
            } else if request.subject_count >= PARALLEL_MIN_SUBJECTS {
                VisualizationDecision::new(
                    ParallelCoordinates,
                    subset,
                    "parallel coordinates expose crossover patterns across 3 or more subjects",
                )
            } else {
                VisualizationDecision::new(
                    Radar,
                    subset,
                    "few dimensions and subjects remain legible on a radar",
                )
            }
        }
        (ViewMode::FortySevenD, ViewLevel::Overview) => VisualizationDecision::new(
            Bar,
            DimensionSubset::Leading(request.dimension_count),
            "bar chart is the general-purpose fallback",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(mode: ViewMode, level: ViewLevel, subjects: usize, dims: usize) -> ChartType {
        select_chart(&ChartRequest {
            view_mode: mode,
            view_level: level,
            subject_count: subjects,
            dimension_count: dims,
        })
        .chart_type
    }

    #[test]
    fn test_decision_table() {
        use ViewLevel::*;
        use ViewMode::*;
        assert_eq!(decide(SixD, Detailed, 5, 47), ChartType::Radar);
        assert_eq!(decide(FortySevenD, Grouped, 2, 47), ChartType::GroupedCards);
        assert_eq!(decide(FortySevenD, Detailed, 2, 13), ChartType::Bar);
        assert_eq!(decide(FortySevenD, Detailed, 3, 12), ChartType::ParallelCoordinates);
        assert_eq!(decide(FortySevenD, Detailed, 2, 12), ChartType::Radar);
        assert_eq!(decide(FortySevenD, Overview, 2, 6), ChartType::Bar);
    }

    #[test]
    fn test_view_mode_serde_names() {
        assert_eq!(serde_json::to_string(&ViewMode::FortySevenD).unwrap(), "\"47d\"");
        let mode: ViewMode = serde_json::from_str("\"6d\"").unwrap();
        assert_eq!(mode, ViewMode::SixD);
        assert_eq!(serde_json::to_string(&ChartType::ParallelCoordinates).unwrap(), "\"parallel-coordinates\"");
    }
}
