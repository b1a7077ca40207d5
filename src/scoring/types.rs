use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dimensions::{Category, CulturalPerspective, DimensionKey};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Clamp into the score range. Non-finite input is treated as absent.
pub fn clamp_score(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(MIN_SCORE, MAX_SCORE))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Coarse 6-category summary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score6D(BTreeMap<Category, f64>);

impl Score6D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every category set to the same value
    pub fn uniform(value: f64) -> Self {
        Category::ALL.iter().map(|c| (*c, value)).collect()
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.0.get(&category).copied()
    }

    pub fn set(&mut self, category: Category, value: f64) {
        if let Some(v) = clamp_score(value) {
            self.0.insert(category, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean over the categories present
    pub fn overall(&self) -> Option<f64> {
        mean(self.0.values().copied())
    }
}

impl FromIterator<(Category, f64)> for Score6D {
    fn from_iter<I: IntoIterator<Item = (Category, f64)>>(iter: I) -> Self {
        let mut score = Score6D::new();
        for (c, v) in iter {
            score.set(c, v);
        }
        score
    }
}

/// Fine-grained scores, possibly partial. Missing keys mean "absent", never 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score47D(BTreeMap<DimensionKey, f64>);

impl Score47D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniform(value: f64) -> Self {
        DimensionKey::all().map(|k| (k, value)).collect()
    }

    pub fn get(&self, key: DimensionKey) -> Option<f64> {
        self.0.get(&key).copied()
    }

    pub fn set(&mut self, key: DimensionKey, value: f64) {
        if let Some(v) = clamp_score(value) {
            self.0.insert(key, v);
        }
    }

    pub fn remove(&mut self, key: DimensionKey) -> Option<f64> {
        self.0.remove(&key)
    }

    /// Present values in registry order
    pub fn iter(&self) -> impl Iterator<Item = (DimensionKey, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Present values owned by a category
    pub fn values_in(&self, category: Category) -> Vec<f64> {
        category.dimensions().filter_map(|k| self.get(k)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(DimensionKey, f64)> for Score47D {
    fn from_iter<I: IntoIterator<Item = (DimensionKey, f64)>>(iter: I) -> Self {
        let mut score = Score47D::new();
        for (k, v) in iter {
            score.set(k, v);
        }
        score
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CulturalScores(BTreeMap<CulturalPerspective, f64>);

impl CulturalScores {
    pub fn get(&self, perspective: CulturalPerspective) -> Option<f64> {
        self.0.get(&perspective).copied()
    }

    pub fn set(&mut self, perspective: CulturalPerspective, value: f64) {
        if let Some(v) = clamp_score(value) {
            self.0.insert(perspective, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CulturalPerspective, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CulturalPerspective, f64)> for CulturalScores {
    fn from_iter<I: IntoIterator<Item = (CulturalPerspective, f64)>>(iter: I) -> Self {
        let mut scores = CulturalScores::default();
        for (p, v) in iter {
            scores.set(p, v);
        }
        scores
    }
}

/// Where a score representation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Delivered by the evaluation source
    Measured,
    /// Expanded from 6D with random jitter; an approximation
    Synthesized,
    /// Averaged down from 47D
    Aggregated,
    #[default]
    Missing,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Measured => "measured",
            ScoreSource::Synthesized => "synthesized",
            ScoreSource::Aggregated => "aggregated",
            ScoreSource::Missing => "missing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Provenance {
    pub score_6d: ScoreSource,
    pub score_47d: ScoreSource,
    /// Categories whose aggregated 6D value had no 47D data behind it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insufficient_categories: Vec<Category>,
}

/// One evaluated subject. Derivations never mutate a record; they return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub subject_id: String,
    pub subject_name: String,
    #[serde(default)]
    pub score_6d: Option<Score6D>,
    #[serde(default)]
    pub score_47d: Option<Score47D>,
    #[serde(default)]
    pub cultural_perspectives: CulturalScores,
    pub evaluated_at: DateTime<Utc>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl EvaluationRecord {
    pub fn new(subject_id: impl Into<String>, subject_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_name: subject_name.into(),
            score_6d: None,
            score_47d: None,
            cultural_perspectives: CulturalScores::default(),
            evaluated_at: Utc::now(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_6d(mut self, score: Score6D) -> Self {
        self.score_6d = Some(score);
        self.provenance.score_6d = ScoreSource::Measured;
        self
    }

    pub fn with_47d(mut self, score: Score47D) -> Self {
        self.score_47d = Some(score);
        self.provenance.score_47d = ScoreSource::Measured;
        self
    }

    pub fn with_cultural(mut self, scores: CulturalScores) -> Self {
        self.cultural_perspectives = scores;
        self
    }

    pub fn evaluated_at(mut self, at: DateTime<Utc>) -> Self {
        self.evaluated_at = at;
        self
    }

    pub fn has_6d(&self) -> bool {
        self.score_6d.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn has_47d(&self) -> bool {
        self.score_47d.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// A record with neither representation is "no data", not a zero score
    pub fn is_evaluable(&self) -> bool {
        self.has_6d() || self.has_47d()
    }

    pub fn is_synthesized(&self) -> bool {
        self.provenance.score_47d == ScoreSource::Synthesized
    }

    /// Category value usable for statistics; insufficient-data placeholders are absent
    pub fn category_value(&self, category: Category) -> Option<f64> {
        if self.provenance.insufficient_categories.contains(&category) {
            return None;
        }
        self.score_6d.as_ref().and_then(|s| s.get(category))
    }

    pub fn dimension_value(&self, key: DimensionKey) -> Option<f64> {
        self.score_47d.as_ref().and_then(|s| s.get(key))
    }

    /// Mean of usable 6D categories
    pub fn overall(&self) -> Option<f64> {
        mean(Category::ALL.iter().filter_map(|c| self.category_value(*c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_clamped() {
        let mut s = Score6D::new();
        s.set(Category::Impact, 140.0);
        s.set(Category::Creativity, -3.0);
        s.set(Category::Technical, f64::NAN);
        assert_eq!(s.get(Category::Impact), Some(100.0));
        assert_eq!(s.get(Category::Creativity), Some(0.0));
        assert_eq!(s.get(Category::Technical), None);
    }

    #[test]
    fn test_record_without_scores_is_not_evaluable() {
        let record = EvaluationRecord::new("m1", "Model One");
        assert!(!record.is_evaluable());
        let record = record.with_47d(Score47D::new());
        assert!(!record.is_evaluable(), "an empty 47D map carries no data");
    }

    #[test]
    fn test_score6d_accepts_alternate_category_names() {
        let json = r#"{"creativity":90,"technique":80,"emotion":70,"context":60,"innovation":50,"impact":40}"#;
        let s: Score6D = serde_json::from_str(json).unwrap();
        assert_eq!(s.len(), 6);
        assert_eq!(s.get(Category::Contextual), Some(60.0));
        assert_eq!(s.overall(), Some(65.0));
    }

    #[test]
    fn test_category_value_hides_insufficient_placeholder() {
        let mut record = EvaluationRecord::new("m", "M").with_6d(Score6D::uniform(0.0));
        record.provenance.insufficient_categories.push(Category::Impact);
        assert_eq!(record.category_value(Category::Impact), None);
        assert_eq!(record.category_value(Category::Creativity), Some(0.0));
    }
}
