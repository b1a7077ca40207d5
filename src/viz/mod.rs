//! Visualization Module
//!
//! Chooses how the chart layer should present comparison data. Rendering
//! itself happens elsewhere.

mod selector;
mod settings;

pub use selector::{
    select_chart, ChartRequest, ChartType, DimensionSubset, ViewLevel, ViewMode, VisualizationDecision,
    MAX_RADAR_AXES, PARALLEL_MIN_SUBJECTS,
};
pub use settings::ViewSettings;
