//! Export
//!
//! Snapshot of a comparison view, complete enough to redraw it without
//! going back to the network. JSON carries everything; CSV is the flat
//! per-subject table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::analysis::ComparisonResult;
use crate::dimensions::{Category, DimensionInfo, DimensionKey, PerspectiveInfo};
use crate::error::EngineResult;
use crate::scoring::EvaluationRecord;
use crate::service::ComparisonReport;
use crate::viz::{ViewSettings, VisualizationDecision};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub export_id: String,
    pub exported_at: DateTime<Utc>,
    pub view: ViewSettings,
    pub records: Vec<EvaluationRecord>,
    #[serde(default)]
    pub comparison: Option<ComparisonResult>,
    /// Catalog entries for the dimensions in use
    #[serde(default)]
    pub dimensions: Vec<DimensionInfo>,
    /// Catalog entries for the cultural perspectives in the comparison
    #[serde(default)]
    pub perspectives: Vec<PerspectiveInfo>,
    #[serde(default)]
    pub decision: Option<VisualizationDecision>,
}

impl ExportBundle {
    /// Records only, no comparison computed
    pub fn from_records(records: Vec<EvaluationRecord>, view: ViewSettings) -> Self {
        Self {
            export_id: Uuid::new_v4().to_string(),
            exported_at: Utc::now(),
            view,
            records,
            comparison: None,
            dimensions: Vec::new(),
            perspectives: Vec::new(),
            decision: None,
        }
    }

    pub fn from_report(report: &ComparisonReport) -> Self {
        Self {
            comparison: Some(report.result.clone()),
            dimensions: report.dimensions.clone(),
            perspectives: report.perspectives.clone(),
            decision: Some(report.decision.clone()),
            ..Self::from_records(report.result.subjects.clone(), report.view)
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn write_json(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        fs::write(path.as_ref(), self.to_json()?).await?;
        info!(export_id = %self.export_id, path = %path.as_ref().display(), "wrote JSON export");
        Ok(())
    }

    /// One row per record. An empty cell means the value is absent, which is
    /// not the same as a score of 0.
    pub fn to_csv(&self) -> String {
        let mut header: Vec<String> = [
            "subject_id",
            "subject_name",
            "evaluated_at",
            "source_6d",
            "source_47d",
            "synthesized",
            "overall",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(Category::ALL.iter().map(|c| c.as_str().to_string()));
        header.extend(DimensionKey::all().map(|k| k.as_str().to_string()));

        let mut out = csv_line(&header);
        for record in &self.records {
            let mut row = vec![
                record.subject_id.clone(),
                record.subject_name.clone(),
                record.evaluated_at.to_rfc3339(),
                record.provenance.score_6d.as_str().to_string(),
                record.provenance.score_47d.as_str().to_string(),
                record.is_synthesized().to_string(),
                cell(record.overall()),
            ];
            row.extend(Category::ALL.iter().map(|c| cell(record.category_value(*c))));
            row.extend(DimensionKey::all().map(|k| cell(record.dimension_value(k))));
            out.push_str(&csv_line(&row));
        }
        out
    }

    pub async fn write_csv(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        fs::write(path.as_ref(), self.to_csv()).await?;
        info!(export_id = %self.export_id, path = %path.as_ref().display(), "wrote CSV export");
        Ok(())
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| escape(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Score47D, Score6D};

    fn sample() -> ExportBundle {
        let partial: Score47D = DimensionKey::all().take(3).map(|k| (k, 0.0)).collect();
        let records = vec![
            EvaluationRecord::new("gpt-4o", "GPT-4o, 2024").with_6d(Score6D::uniform(80.0)).with_47d(partial),
            EvaluationRecord::new("claude", "Claude \"3\"").with_6d(Score6D::uniform(70.0)),
        ];
        ExportBundle::from_records(records, ViewSettings::default())
    }

    #[test]
    fn test_csv_shape_and_escaping() {
        let csv = sample().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split(',').count(), 7 + 6 + 47);
        assert!(lines[1].starts_with("gpt-4o,\"GPT-4o, 2024\","));
        assert!(lines[2].starts_with("claude,\"Claude \"\"3\"\"\","));
    }

    #[test]
    fn test_csv_distinguishes_zero_from_absent() {
        let csv = sample().to_csv();
        let row: Vec<&str> = csv.lines().nth(2).unwrap().rsplitn(48, ',').collect();
        // the second record has no 47D data at all
        assert!(row[..47].iter().all(|c| c.is_empty()));

        let first = csv.lines().nth(1).unwrap();
        assert!(first.contains(",0.00,0.00,0.00,"));
    }

    #[tokio::test]
    async fn test_json_export_roundtrip() {
        let bundle = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        bundle.write_json(&path).await.unwrap();

        let loaded = ExportBundle::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, bundle);
        assert_eq!(Uuid::parse_str(&loaded.export_id).unwrap().get_version_num(), 4);
    }
}
