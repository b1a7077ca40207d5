//! Comparison Engine
//!
//! Pairwise dissimilarity between subjects, extreme pairs, per-axis
//! statistics and per-perspective cultural summaries.
//!
//! The pairwise metric is a partial-coverage mean: two subjects are compared
//! only on the axes both have values for, and the number of shared axes is
//! kept alongside the difference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::stats::summarize;
use crate::dimensions::{Category, CulturalPerspective, DimensionKey};
use crate::error::{EngineError, EngineResult};
use crate::scoring::EvaluationRecord;

const CONSISTENCY_EPSILON: f64 = 1e-9;

/// Which score representation a comparison runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonBasis {
    /// The 6 coarse categories
    Categories,
    /// The 47 fine-grained dimensions
    #[default]
    Dimensions,
}

/// A compared axis: a category or a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreAxis {
    Category(Category),
    Dimension(DimensionKey),
}

impl ScoreAxis {
    pub fn label(&self) -> String {
        match self {
            ScoreAxis::Category(c) => c.label().to_string(),
            ScoreAxis::Dimension(d) => d.label(),
        }
    }
}

impl ComparisonBasis {
    pub fn axes(&self) -> Vec<ScoreAxis> {
        match self {
            ComparisonBasis::Categories => Category::ALL.iter().map(|c| ScoreAxis::Category(*c)).collect(),
            ComparisonBasis::Dimensions => DimensionKey::all().map(ScoreAxis::Dimension).collect(),
        }
    }

    fn value(&self, record: &EvaluationRecord, axis: ScoreAxis) -> Option<f64> {
        match axis {
            ScoreAxis::Category(c) => record.category_value(c),
            ScoreAxis::Dimension(d) => record.dimension_value(d),
        }
    }

    fn is_evaluable(&self, record: &EvaluationRecord) -> bool {
        match self {
            ComparisonBasis::Categories => Category::ALL.iter().any(|c| record.category_value(*c).is_some()),
            ComparisonBasis::Dimensions => record.has_47d(),
        }
    }
}

/// Difference between two subjects; `first` sorts before `second`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDifference {
    pub first: String,
    pub second: String,
    pub difference: f64,
    /// Axes both subjects have values for
    pub coverage: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisStats {
    pub axis: ScoreAxis,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalSummary {
    pub mean: f64,
    pub std: f64,
    /// Subject id with the highest score; first in input order on ties
    pub best_model: String,
    pub best_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub basis: ComparisonBasis,
    pub subjects: Vec<EvaluationRecord>,
    /// Ids of input records dropped for lack of data on this basis
    pub excluded_subjects: Vec<String>,
    pub difference_matrix: Vec<Vec<f64>>,
    pub coverage_matrix: Vec<Vec<usize>>,
    pub most_similar_pair: Option<PairDifference>,
    pub most_different_pair: Option<PairDifference>,
    pub average_difference: f64,
    pub per_dimension_stats: Vec<AxisStats>,
    pub cultural_analysis: BTreeMap<CulturalPerspective, CulturalSummary>,
}

impl ComparisonResult {
    fn position(&self, subject_id: &str) -> Option<usize> {
        self.subjects.iter().position(|r| r.subject_id == subject_id)
    }

    /// Number of axes two subjects were compared on
    pub fn coverage(&self, a: &str, b: &str) -> Option<usize> {
        Some(self.coverage_matrix[self.position(a)?][self.position(b)?])
    }

    pub fn difference(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.difference_matrix[self.position(a)?][self.position(b)?])
    }

    /// Unordered pairs, each once, in matrix order
    pub fn pairs(&self) -> Vec<PairDifference> {
        let n = self.subjects.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push(make_pair(
                    &self.subjects[i].subject_id,
                    &self.subjects[j].subject_id,
                    self.difference_matrix[i][j],
                    self.coverage_matrix[i][j],
                ));
            }
        }
        pairs
    }
}

fn make_pair(a: &str, b: &str, difference: f64, coverage: usize) -> PairDifference {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    PairDifference { first: first.to_string(), second: second.to_string(), difference, coverage }
}

/// Mean absolute difference over the axes both records have, with the
/// number of shared axes. No shared axes gives `(0.0, 0)`.
pub fn pairwise_difference(a: &EvaluationRecord, b: &EvaluationRecord, basis: ComparisonBasis) -> (f64, usize) {
    let (sum, coverage) = basis
        .axes()
        .into_iter()
        .filter_map(|axis| Some((basis.value(a, axis)?, basis.value(b, axis)?)))
        .fold((0.0, 0usize), |(s, n), (x, y)| (s + (x - y).abs(), n + 1));

    if coverage == 0 {
        (0.0, 0)
    } else {
        (sum / coverage as f64, coverage)
    }
}

/// Compare subjects on their 47D scores.
pub fn compare(records: &[EvaluationRecord]) -> EngineResult<ComparisonResult> {
    compare_on(records, ComparisonBasis::Dimensions)
}

/// Compare subjects on the given basis. Needs at least 2 records with data
/// on that basis, otherwise fails with `InsufficientSubjects`.
pub fn compare_on(records: &[EvaluationRecord], basis: ComparisonBasis) -> EngineResult<ComparisonResult> {
    let (subjects, excluded): (Vec<&EvaluationRecord>, Vec<&EvaluationRecord>) =
        records.iter().partition(|r| basis.is_evaluable(r));

    if subjects.len() < 2 {
        return Err(EngineError::InsufficientSubjects { found: subjects.len() });
    }
    if !excluded.is_empty() {
        debug!(count = excluded.len(), "excluding subjects without data from comparison");
    }

    let n = subjects.len();
    let mut difference_matrix = vec![vec![0.0; n]; n];
    let mut coverage_matrix = vec![vec![0usize; n]; n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                coverage_matrix[i][j] = basis.axes().iter().filter(|a| basis.value(subjects[i], **a).is_some()).count();
                continue;
            }
            let (difference, coverage) = pairwise_difference(subjects[i], subjects[j], basis);
            difference_matrix[i][j] = difference;
            coverage_matrix[i][j] = coverage;
        }
    }
    enforce_symmetry(&mut difference_matrix);

    let mut comparable = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if coverage_matrix[i][j] == 0 {
                warn!(
                    a = %subjects[i].subject_id,
                    b = %subjects[j].subject_id,
                    "subjects share no scored axes, pair left out of extremes and average"
                );
                continue;
            }
            comparable.push(make_pair(
                &subjects[i].subject_id,
                &subjects[j].subject_id,
                difference_matrix[i][j],
                coverage_matrix[i][j],
            ));
        }
    }

    let tie_order = |a: &PairDifference, b: &PairDifference| (&a.first, &a.second).cmp(&(&b.first, &b.second));
    let most_similar_pair = comparable
        .iter()
        .min_by(|a, b| a.difference.total_cmp(&b.difference).then_with(|| tie_order(a, b)))
        .cloned();
    let most_different_pair = comparable
        .iter()
        .min_by(|a, b| b.difference.total_cmp(&a.difference).then_with(|| tie_order(a, b)))
        .cloned();
    let average_difference = if comparable.is_empty() {
        0.0
    } else {
        comparable.iter().map(|p| p.difference).sum::<f64>() / comparable.len() as f64
    };

    let per_dimension_stats = basis
        .axes()
        .into_iter()
        .map(|axis| {
            let values: Vec<f64> = subjects.iter().filter_map(|r| basis.value(r, axis)).collect();
            let s = summarize(&values);
            AxisStats { axis, mean: s.mean, std: s.std, min: s.min, max: s.max, count: s.count }
        })
        .collect();

    let cultural_analysis = analyze_cultural(&subjects);

    Ok(ComparisonResult {
        basis,
        subjects: subjects.into_iter().cloned().collect(),
        excluded_subjects: excluded.into_iter().map(|r| r.subject_id.clone()).collect(),
        difference_matrix,
        coverage_matrix,
        most_similar_pair,
        most_different_pair,
        average_difference,
        per_dimension_stats,
        cultural_analysis,
    })
}

/// Zero the diagonal and make `m[i][j] == m[j][i]`. Cells are computed
/// independently, so a mismatch means the metric lost commutativity.
fn enforce_symmetry(matrix: &mut [Vec<f64>]) {
    let n = matrix.len();
    for i in 0..n {
        matrix[i][i] = 0.0;
        for j in (i + 1)..n {
            let (upper, lower) = (matrix[i][j], matrix[j][i]);
            if (upper - lower).abs() > CONSISTENCY_EPSILON {
                warn!(i, j, upper, lower, "asymmetric difference matrix cell, averaging");
            }
            let value = (upper + lower) / 2.0;
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }
}

fn analyze_cultural(subjects: &[&EvaluationRecord]) -> BTreeMap<CulturalPerspective, CulturalSummary> {
    let mut analysis = BTreeMap::new();

    for perspective in CulturalPerspective::ALL {
        let scored: Vec<(&str, f64)> = subjects
            .iter()
            .filter_map(|r| Some((r.subject_id.as_str(), r.cultural_perspectives.get(perspective)?)))
            .collect();

        let mut best: Option<(&str, f64)> = None;
        for &(id, score) in &scored {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((id, score));
            }
        }
        let Some((best_model, best_score)) = best else {
            continue;
        };

        let values: Vec<f64> = scored.iter().map(|(_, v)| *v).collect();
        let s = summarize(&values);
        analysis.insert(
            perspective,
            CulturalSummary {
                mean: s.mean,
                std: s.std,
                best_model: best_model.to_string(),
                best_score,
                count: s.count,
            },
        );
    }

    analysis
}
