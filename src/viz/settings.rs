use serde::{Deserialize, Serialize};

use super::selector::{ViewLevel, ViewMode};
use crate::analysis::FilterMode;

/// What the user currently has selected in the comparison view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewSettings {
    pub view_mode: ViewMode,
    pub view_level: ViewLevel,
    pub filter_mode: FilterMode,
    /// Only read for `FilterMode::Custom`
    pub custom_count: Option<usize>,
}

impl ViewSettings {
    pub fn new(view_mode: ViewMode) -> Self {
        Self { view_mode, ..Self::default() }
    }

    pub fn level(mut self, view_level: ViewLevel) -> Self {
        self.view_level = view_level;
        self
    }

    pub fn filter(mut self, filter_mode: FilterMode, custom_count: Option<usize>) -> Self {
        self.filter_mode = filter_mode;
        self.custom_count = custom_count;
        self
    }
}
