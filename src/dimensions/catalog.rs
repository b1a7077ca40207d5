//! Dimension and cultural-perspective catalogs as served by the evaluation
//! API, with built-in equivalents derived from the registry.

use serde::{Deserialize, Serialize};

use super::perspectives::CulturalPerspective;
use super::registry::{resolve, Category, DimensionKey, DIMENSION_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInfo {
    #[serde(alias = "key")]
    pub id: String,
    #[serde(alias = "displayName", alias = "name")]
    pub display_name: String,
    pub category: Category,
}

/// Ordered list of the 47 dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DimensionCatalog {
    pub entries: Vec<DimensionInfo>,
}

impl DimensionCatalog {
    pub fn builtin() -> Self {
        Self {
            entries: DimensionKey::all()
                .map(|k| DimensionInfo {
                    id: k.as_str().to_string(),
                    display_name: k.label(),
                    category: k.category(),
                })
                .collect(),
        }
    }

    /// Problems that make this catalog unusable for 47D views. Empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.entries.len() != DIMENSION_COUNT {
            problems.push(format!("expected {} dimensions, got {}", DIMENSION_COUNT, self.entries.len()));
        }
        for entry in &self.entries {
            match resolve(&entry.id).key {
                None => problems.push(format!("unknown dimension '{}'", entry.id)),
                Some(key) if key.category() != entry.category => problems.push(format!(
                    "dimension '{}' listed under {} but belongs to {}",
                    entry.id,
                    entry.category,
                    key.category()
                )),
                Some(_) => {}
            }
        }
        problems
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Display name from the catalog, falling back to the registry label
    pub fn display_name(&self, key: DimensionKey) -> String {
        self.entries
            .iter()
            .find(|e| resolve(&e.id).key == Some(key))
            .map(|e| e.display_name.clone())
            .unwrap_or_else(|| key.label())
    }

    /// Entries for the given keys, in the order given
    pub fn subset(&self, keys: &[DimensionKey]) -> Vec<DimensionInfo> {
        keys.iter()
            .map(|k| DimensionInfo {
                id: k.as_str().to_string(),
                display_name: self.display_name(*k),
                category: k.category(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveInfo {
    #[serde(alias = "key")]
    pub id: String,
    #[serde(alias = "displayName", alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerspectiveCatalog {
    pub entries: Vec<PerspectiveInfo>,
}

impl PerspectiveCatalog {
    pub fn builtin() -> Self {
        Self {
            entries: CulturalPerspective::ALL
                .iter()
                .map(|p| PerspectiveInfo {
                    id: p.as_str().to_string(),
                    display_name: p.label().to_string(),
                    description: p.description().to_string(),
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.entries.len() != CulturalPerspective::ALL.len() {
            problems.push(format!(
                "expected {} perspectives, got {}",
                CulturalPerspective::ALL.len(),
                self.entries.len()
            ));
        }
        for entry in &self.entries {
            if entry.id.parse::<CulturalPerspective>().is_err() {
                problems.push(format!("unknown perspective '{}'", entry.id));
            }
        }
        problems
    }

    /// Entries for the given perspectives, in the order given. Perspectives
    /// the catalog lacks get their built-in description.
    pub fn subset(&self, perspectives: &[CulturalPerspective]) -> Vec<PerspectiveInfo> {
        perspectives
            .iter()
            .map(|p| {
                self.entries
                    .iter()
                    .find(|e| e.id.parse::<CulturalPerspective>().ok() == Some(*p))
                    .cloned()
                    .unwrap_or_else(|| PerspectiveInfo {
                        id: p.as_str().to_string(),
                        display_name: p.label().to_string(),
                        description: p.description().to_string(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogs_are_valid() {
        assert!(DimensionCatalog::builtin().is_valid());
        assert!(PerspectiveCatalog::builtin().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_miscategorized_entry() {
        let mut catalog = DimensionCatalog::builtin();
        catalog.entries[0].category = Category::Impact;
        let problems = catalog.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("originality"));
    }

    #[test]
    fn test_subset_uses_catalog_display_names() {
        let mut catalog = DimensionCatalog::builtin();
        catalog.entries[0].display_name = "Originality (novelty)".to_string();
        let key = DimensionKey::from_index(0).unwrap();
        let subset = catalog.subset(&[key]);
        assert_eq!(subset[0].display_name, "Originality (novelty)");
    }

    #[test]
    fn test_perspective_subset_falls_back_to_builtin() {
        let mut catalog = PerspectiveCatalog::builtin();
        catalog.entries.retain(|e| e.id != "eastern");
        catalog.entries[0].description = "Served description".to_string();
        let first: CulturalPerspective = catalog.entries[0].id.parse().unwrap();

        let subset = catalog.subset(&[CulturalPerspective::Eastern, first]);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset[0].id, "eastern");
        assert_eq!(subset[0].description, CulturalPerspective::Eastern.description());
        assert_eq!(subset[1].description, "Served description");
    }
}
