//! Upstream record shapes and the source trait the engine fetches through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::dimensions::{resolve, Category, CulturalPerspective, DimensionCatalog, PerspectiveCatalog};
use crate::error::{FetchError, FetchErrorKind};
use crate::scoring::{CulturalScores, EvaluationRecord, Score47D, Score6D};

/// One subject's evaluation as the API delivers it. Keys are loose strings;
/// `into_record` resolves them against the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvaluation {
    #[serde(alias = "model_id", alias = "id")]
    pub subject_id: String,
    #[serde(default, alias = "model_name", alias = "name")]
    pub subject_name: String,
    #[serde(default, alias = "scores_6d", alias = "score6D")]
    pub score_6d: Option<BTreeMap<String, f64>>,
    #[serde(default, alias = "scores_47d", alias = "score47D")]
    pub score_47d: Option<BTreeMap<String, f64>>,
    #[serde(default, alias = "cultural_scores", alias = "culturalPerspectives")]
    pub cultural_perspectives: Option<BTreeMap<String, f64>>,
    #[serde(default, alias = "evaluatedAt", alias = "timestamp")]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl RawEvaluation {
    /// Adapt into an engine record. Unknown keys are dropped with a warning;
    /// values are clamped into [0, 100].
    pub fn into_record(self) -> EvaluationRecord {
        let subject_name = if self.subject_name.is_empty() { self.subject_id.clone() } else { self.subject_name };
        let mut record = EvaluationRecord::new(self.subject_id, subject_name);
        if let Some(at) = self.evaluated_at {
            record = record.evaluated_at(at);
        }

        if let Some(raw) = self.score_6d {
            let mut summary = Score6D::new();
            for (name, value) in raw {
                match Category::parse(&name) {
                    Some(c) => summary.set(c, value),
                    None => warn!(subject = %record.subject_id, category = %name, "dropping unknown category"),
                }
            }
            if !summary.is_empty() {
                record = record.with_6d(summary);
            }
        }

        if let Some(raw) = self.score_47d {
            let mut detail = Score47D::new();
            for (name, value) in raw {
                match resolve(&name).key {
                    Some(k) => detail.set(k, value),
                    None => warn!(subject = %record.subject_id, dimension = %name, "dropping unknown dimension"),
                }
            }
            if !detail.is_empty() {
                record = record.with_47d(detail);
            }
        }

        if let Some(raw) = self.cultural_perspectives {
            let mut cultural = CulturalScores::default();
            for (name, value) in raw {
                match name.parse::<CulturalPerspective>() {
                    Ok(p) => cultural.set(p, value),
                    Err(_) => warn!(subject = %record.subject_id, perspective = %name, "dropping unknown perspective"),
                }
            }
            record = record.with_cultural(cultural);
        }

        record
    }
}

/// Where evaluation data and catalogs come from
#[async_trait]
pub trait EvaluationSource: Send + Sync {
    async fn fetch_dimension_catalog(&self) -> Result<DimensionCatalog, FetchError>;
    async fn fetch_perspective_catalog(&self) -> Result<PerspectiveCatalog, FetchError>;
    async fn fetch_evaluation(&self, subject_id: &str) -> Result<RawEvaluation, FetchError>;
}

/// In-process source over already-loaded evaluations (files, fixtures)
#[derive(Debug, Clone, Default)]
pub struct StaticEvaluationSource {
    evaluations: HashMap<String, RawEvaluation>,
    dimension_catalog: Option<DimensionCatalog>,
    perspective_catalog: Option<PerspectiveCatalog>,
}

impl StaticEvaluationSource {
    /// Built-in catalogs plus the given evaluations
    pub fn new(evaluations: impl IntoIterator<Item = RawEvaluation>) -> Self {
        Self {
            evaluations: evaluations.into_iter().map(|e| (e.subject_id.clone(), e)).collect(),
            dimension_catalog: Some(DimensionCatalog::builtin()),
            perspective_catalog: Some(PerspectiveCatalog::builtin()),
        }
    }

    /// Make catalog fetches fail, as an unreachable catalog endpoint would
    pub fn without_catalogs(mut self) -> Self {
        self.dimension_catalog = None;
        self.perspective_catalog = None;
        self
    }

    /// Serve this dimension catalog instead of the built-in one
    pub fn with_dimension_catalog(mut self, catalog: DimensionCatalog) -> Self {
        self.dimension_catalog = Some(catalog);
        self
    }

    pub fn with_perspective_catalog(mut self, catalog: PerspectiveCatalog) -> Self {
        self.perspective_catalog = Some(catalog);
        self
    }

    pub fn subject_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.evaluations.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl EvaluationSource for StaticEvaluationSource {
    async fn fetch_dimension_catalog(&self) -> Result<DimensionCatalog, FetchError> {
        self.dimension_catalog
            .clone()
            .ok_or_else(|| FetchError::new(FetchErrorKind::Offline, "static://evaluation-dimensions", "catalog not loaded"))
    }

    async fn fetch_perspective_catalog(&self) -> Result<PerspectiveCatalog, FetchError> {
        self.perspective_catalog
            .clone()
            .ok_or_else(|| FetchError::new(FetchErrorKind::Offline, "static://cultural-perspectives", "catalog not loaded"))
    }

    async fn fetch_evaluation(&self, subject_id: &str) -> Result<RawEvaluation, FetchError> {
        self.evaluations.get(subject_id).cloned().ok_or_else(|| {
            FetchError::from_status(404, format!("static://models/{}/evaluation", subject_id), "unknown subject")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::DimensionKey;
    use crate::scoring::ScoreSource;

    #[test]
    fn test_into_record_resolves_surface_forms() {
        let json = r#"{
            "model_id": "gpt-4o",
            "model_name": "GPT-4o",
            "scores_6d": {"creativity": 90, "technique": 80, "bogus": 1},
            "scores_47d": {"dim_0": 91, "Craft Excellence": 130, "brushwork": 50},
            "cultural_scores": {"eastern": 77, "atlantean": 10}
        }"#;
        let raw: RawEvaluation = serde_json::from_str(json).unwrap();
        let record = raw.into_record();

        assert_eq!(record.subject_name, "GPT-4o");
        let summary = record.score_6d.as_ref().unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.get(Category::Technical), Some(80.0));

        let detail = record.score_47d.as_ref().unwrap();
        assert_eq!(detail.len(), 2);
        assert_eq!(detail.get(DimensionKey::parse("originality").unwrap()), Some(91.0));
        assert_eq!(detail.get(DimensionKey::parse("craft_excellence").unwrap()), Some(100.0));
        assert_eq!(record.provenance.score_47d, ScoreSource::Measured);
        assert_eq!(record.cultural_perspectives.get(CulturalPerspective::Eastern), Some(77.0));
    }

    #[tokio::test]
    async fn test_static_source_unknown_subject_is_client_error() {
        let source = StaticEvaluationSource::new(Vec::new());
        let err = source.fetch_evaluation("ghost").await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Client);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_static_source_serves_supplied_catalogs() {
        let mut perspectives = PerspectiveCatalog::builtin();
        perspectives.entries.truncate(2);
        let source = StaticEvaluationSource::new(Vec::new())
            .without_catalogs()
            .with_dimension_catalog(DimensionCatalog::default())
            .with_perspective_catalog(perspectives);

        assert!(source.fetch_dimension_catalog().await.unwrap().entries.is_empty());
        assert_eq!(source.fetch_perspective_catalog().await.unwrap().entries.len(), 2);
    }

    #[tokio::test]
    async fn test_static_source_without_catalogs() {
        let source = StaticEvaluationSource::new(Vec::new()).without_catalogs();
        assert!(source.fetch_dimension_catalog().await.is_err());
        assert!(source.fetch_perspective_catalog().await.unwrap_err().is_offline());
    }
}
