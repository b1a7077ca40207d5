//! Dimensions Module
//!
//! The 47-dimension registry, its 6 parent categories, the 8 cultural
//! perspectives, and the catalogs describing them.

mod catalog;
mod perspectives;
mod registry;

pub use catalog::{DimensionCatalog, DimensionInfo, PerspectiveCatalog, PerspectiveInfo};
pub use perspectives::CulturalPerspective;
pub use registry::{
    category_of, format_label, label_of, resolve, Category, DimensionKey, Resolution, ResolutionStep,
    DIMENSION_COUNT,
};
