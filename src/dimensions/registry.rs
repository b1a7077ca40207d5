//! Dimension Registry
//!
//! Static table of the 47 sub-dimensions, the 6 parent categories that own
//! contiguous ordinal ranges of them, and the surface-form resolution chain
//! used to turn whatever key an upstream payload carries into a label.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Range;
use std::str::FromStr;
use tracing::{debug, trace};

/// Number of fine-grained dimensions
pub const DIMENSION_COUNT: usize = 47;

/// Canonical identifiers in registry (ordinal) order.
const DIMENSION_KEYS: [&str; DIMENSION_COUNT] = [
    // creativity
    "originality",
    "imagination",
    "innovation_depth",
    "artistic_vision",
    "conceptual_novelty",
    "creative_risk",
    "unique_perspective",
    "inspiration_quality",
    // technical
    "skill_mastery",
    "technique_execution",
    "precision",
    "craft_excellence",
    "technical_innovation",
    "structural_integrity",
    "medium_expertise",
    "complexity_handling",
    // emotional
    "emotional_depth",
    "emotional_resonance",
    "mood_creation",
    "feeling_expression",
    "empathy_evocation",
    "emotional_authenticity",
    "sentiment_clarity",
    "affective_impact",
    // contextual
    "cultural_relevance",
    "historical_awareness",
    "social_commentary",
    "contextual_appropriateness",
    "symbolic_meaning",
    "narrative_coherence",
    "thematic_consistency",
    "audience_awareness",
    // innovation
    "experimental_approach",
    "boundary_pushing",
    "genre_blending",
    "medium_innovation",
    "conceptual_breakthrough",
    "stylistic_evolution",
    "paradigm_shift",
    "future_orientation",
    // impact
    "memorable_quality",
    "transformative_power",
    "lasting_impression",
    "viewer_engagement",
    "discussion_provocation",
    "aesthetic_influence",
    "cultural_significance",
];

/// Start offsets of each category range, terminated by `DIMENSION_COUNT`.
const CATEGORY_BOUNDS: [usize; 7] = [0, 8, 16, 24, 32, 40, DIMENSION_COUNT];

lazy_static! {
    static ref ORDINAL_PLACEHOLDER: Regex = Regex::new(r"^dim_(\d+)$").unwrap();
    static ref CAMEL_BOUNDARY: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

// ──────────────────────────────────────────────────────────────────────────────
// CATEGORIES
// ──────────────────────────────────────────────────────────────────────────────

/// One of the six coarse quality categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Creativity,
    #[serde(alias = "technique")]
    Technical,
    #[serde(alias = "emotion")]
    Emotional,
    #[serde(alias = "context")]
    Contextual,
    Innovation,
    Impact,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Creativity,
        Category::Technical,
        Category::Emotional,
        Category::Contextual,
        Category::Innovation,
        Category::Impact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Creativity => "creativity",
            Category::Technical => "technical",
            Category::Emotional => "emotional",
            Category::Contextual => "contextual",
            Category::Innovation => "innovation",
            Category::Impact => "impact",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Creativity => "Creativity",
            Category::Technical => "Technical",
            Category::Emotional => "Emotional",
            Category::Contextual => "Contextual",
            Category::Innovation => "Innovation",
            Category::Impact => "Impact",
        }
    }

    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// Ordinal range of the dimensions owned by this category
    pub fn range(&self) -> Range<usize> {
        let i = self.ordinal();
        CATEGORY_BOUNDS[i]..CATEGORY_BOUNDS[i + 1]
    }

    pub fn dimensions(&self) -> impl Iterator<Item = DimensionKey> {
        self.range().map(|i| DimensionKey(i as u8))
    }

    /// Category owning the dimension at `index`, if the index is in range
    pub fn for_index(index: usize) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.range().contains(&index))
    }

    /// Parse a category name, accepting the alternate names upstream
    /// payloads use (`technique`, `emotion`, `context`).
    pub fn parse(name: &str) -> Option<Category> {
        match fold_surface(name).as_str() {
            "creativity" => Some(Category::Creativity),
            "technical" | "technique" => Some(Category::Technical),
            "emotional" | "emotion" => Some(Category::Emotional),
            "contextual" | "context" => Some(Category::Contextual),
            "innovation" => Some(Category::Innovation),
            "impact" => Some(Category::Impact),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| format!("unknown category '{}'", s))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// DIMENSION KEYS
// ──────────────────────────────────────────────────────────────────────────────

/// Stable identifier of one of the 47 sub-dimensions.
///
/// Only the registry hands these out, so every key is valid by construction.
/// Ordering follows registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DimensionKey(u8);

impl DimensionKey {
    pub fn from_index(index: usize) -> Option<Self> {
        (index < DIMENSION_COUNT).then_some(DimensionKey(index as u8))
    }

    /// All keys in registry order
    pub fn all() -> impl Iterator<Item = DimensionKey> {
        (0..DIMENSION_COUNT).map(|i| DimensionKey(i as u8))
    }

    /// Resolve any accepted surface form to a key
    pub fn parse(surface: &str) -> Option<Self> {
        resolve(surface).key
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn as_str(&self) -> &'static str {
        DIMENSION_KEYS[self.index()]
    }

    pub fn label(&self) -> String {
        format_label(self.as_str())
    }

    pub fn category(&self) -> Category {
        // Every index below DIMENSION_COUNT falls inside one range.
        Category::for_index(self.index()).unwrap_or(Category::Impact)
    }
}

impl std::fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for DimensionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DimensionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DimensionKey::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown dimension '{}'", raw)))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// RESOLUTION CHAIN
// ──────────────────────────────────────────────────────────────────────────────

/// Which step of the chain produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStep {
    /// Exact canonical snake_case identifier
    Canonical,
    /// `dim_<n>` placeholder
    Ordinal,
    /// Humanized, camelCase or kebab-case form of a canonical identifier
    CaseFolded,
    /// Unknown key, label produced by the formatting heuristic
    Formatted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: Option<DimensionKey>,
    pub label: String,
    pub step: ResolutionStep,
}

fn lookup_canonical(surface: &str) -> Option<DimensionKey> {
    DIMENSION_KEYS
        .iter()
        .position(|k| *k == surface)
        .and_then(DimensionKey::from_index)
}

fn lookup_ordinal(surface: &str) -> Option<DimensionKey> {
    let caps = ORDINAL_PLACEHOLDER.captures(surface)?;
    let n: usize = caps.get(1)?.as_str().parse().ok()?;
    DimensionKey::from_index(n)
}

/// Reduce a surface form to lowercase snake_case.
fn fold_surface(surface: &str) -> String {
    let split = CAMEL_BOUNDARY.replace_all(surface.trim(), "${1}_${2}");
    let lowered = split.to_lowercase();
    lowered
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Resolve a dimension key in any accepted surface form.
///
/// Order: canonical → ordinal placeholder → case-folded → formatting
/// heuristic. Never fails; unknown keys still get a readable label.
pub fn resolve(surface: &str) -> Resolution {
    if let Some(key) = lookup_canonical(surface) {
        trace!(surface, step = "canonical", "resolved dimension");
        return Resolution { key: Some(key), label: key.label(), step: ResolutionStep::Canonical };
    }

    if let Some(key) = lookup_ordinal(surface) {
        trace!(surface, step = "ordinal", key = key.as_str(), "resolved dimension");
        return Resolution { key: Some(key), label: key.label(), step: ResolutionStep::Ordinal };
    }

    let folded = fold_surface(surface);
    if let Some(key) = lookup_canonical(&folded).or_else(|| lookup_ordinal(&folded)) {
        trace!(surface, step = "case_folded", key = key.as_str(), "resolved dimension");
        return Resolution { key: Some(key), label: key.label(), step: ResolutionStep::CaseFolded };
    }

    debug!(surface, "unrecognized dimension key, formatting label heuristically");
    Resolution { key: None, label: format_label(surface), step: ResolutionStep::Formatted }
}

/// Human-readable label for a dimension key in any surface form
pub fn label_of(surface: &str) -> String {
    resolve(surface).label
}

/// Owning category of a dimension key, `None` when unrecognized
pub fn category_of(surface: &str) -> Option<Category> {
    resolve(surface).key.map(|k| k.category())
}

/// Split on underscores/hyphens (or lowercase→uppercase transitions when there
/// are none) and title-case every token.
pub fn format_label(raw: &str) -> String {
    let raw = raw.trim();
    let spaced = if raw.contains('_') || raw.contains('-') {
        raw.replace(['_', '-'], " ")
    } else {
        CAMEL_BOUNDARY.replace_all(raw, "${1} ${2}").into_owned()
    };

    spaced
        .split_whitespace()
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
