//! 6D ↔ 47D conversion
//!
//! Expansion is an approximation: each dimension inherits its category's
//! value plus bounded jitter, so the UI has per-dimension variation to draw.
//! Results are tagged `ScoreSource::Synthesized` and must not be read as
//! measurements. The jitter source is injected so tests can seed it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{EvaluationRecord, Score47D, Score6D, ScoreSource};
use crate::dimensions::Category;

/// Maximum absolute jitter applied to synthesized dimensions
pub const JITTER_BOUND: f64 = 5.0;

/// Derive 47D scores from a 6D summary.
///
/// Categories missing from `score` leave their dimensions absent.
pub fn expand_to_47d<R: Rng + ?Sized>(score: &Score6D, rng: &mut R) -> Score47D {
    let mut expanded = Score47D::new();
    for (category, base) in score.iter() {
        for key in category.dimensions() {
            let jitter = rng.gen_range(-JITTER_BOUND..=JITTER_BOUND);
            expanded.set(key, base + jitter);
        }
    }
    expanded
}

/// 6D summary produced from (possibly partial) 47D scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub score: Score6D,
    /// Categories with no present dimensions; their value in `score` is a 0 placeholder
    pub insufficient: Vec<Category>,
}

/// Average present dimension values per category.
pub fn aggregate_to_6d(score: &Score47D) -> Aggregation {
    let mut summary = Score6D::new();
    let mut insufficient = Vec::new();

    for category in Category::ALL {
        let values = score.values_in(category);
        if values.is_empty() {
            insufficient.push(category);
            summary.set(category, 0.0);
            continue;
        }
        summary.set(category, values.iter().sum::<f64>() / values.len() as f64);
    }

    Aggregation { score: summary, insufficient }
}

/// Return a copy of `record` carrying both representations when at least one
/// exists. Records with neither come back unchanged (and non-evaluable).
pub fn normalize<R: Rng + ?Sized>(record: &EvaluationRecord, rng: &mut R) -> EvaluationRecord {
    let mut out = record.clone();

    // Empty maps carry no information.
    if !out.has_6d() {
        out.score_6d = None;
        out.provenance.score_6d = ScoreSource::Missing;
    } else if out.provenance.score_6d == ScoreSource::Missing {
        out.provenance.score_6d = ScoreSource::Measured;
    }
    if !out.has_47d() {
        out.score_47d = None;
        out.provenance.score_47d = ScoreSource::Missing;
    } else if out.provenance.score_47d == ScoreSource::Missing {
        out.provenance.score_47d = ScoreSource::Measured;
    }

    if out.score_47d.is_none() {
        if let Some(summary) = &out.score_6d {
            warn!(subject = %out.subject_id, "synthesizing 47D scores from 6D summary");
            let expanded = expand_to_47d(summary, rng);
            out.score_47d = Some(expanded);
            out.provenance.score_47d = ScoreSource::Synthesized;
        } else {
            debug!(subject = %out.subject_id, "record has no scores, leaving it non-evaluable");
        }
    } else if out.score_6d.is_none() {
        if let Some(detail) = &out.score_47d {
            let aggregation = aggregate_to_6d(detail);
            if !aggregation.insufficient.is_empty() {
                debug!(
                    subject = %out.subject_id,
                    categories = ?aggregation.insufficient,
                    "insufficient 47D data for some categories"
                );
            }
            out.score_6d = Some(aggregation.score);
            out.provenance.score_6d = ScoreSource::Aggregated;
            out.provenance.insufficient_categories = aggregation.insufficient;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::DimensionKey;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_expansion_stays_within_jitter_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut summary = Score6D::uniform(50.0);
        summary.set(Category::Impact, 99.0);
        let expanded = expand_to_47d(&summary, &mut rng);

        assert_eq!(expanded.len(), 47);
        for (key, v) in expanded.iter() {
            let base = summary.get(key.category()).unwrap();
            assert!((v - base).abs() <= JITTER_BOUND);
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_expansion_is_reproducible_with_seed() {
        let summary = Score6D::uniform(70.0);
        let a = expand_to_47d(&summary, &mut StdRng::seed_from_u64(42));
        let b = expand_to_47d(&summary, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_aggregate_flags_empty_category() {
        let mut detail = Score47D::new();
        for key in Category::Creativity.dimensions() {
            detail.set(key, 80.0);
        }
        detail.set(DimensionKey::parse("precision").unwrap(), 60.0);

        let agg = aggregate_to_6d(&detail);
        assert_eq!(agg.score.get(Category::Creativity), Some(80.0));
        assert_eq!(agg.score.get(Category::Technical), Some(60.0));
        assert_eq!(agg.score.get(Category::Impact), Some(0.0));
        assert_eq!(agg.insufficient.len(), 4);
        assert!(!agg.insufficient.contains(&Category::Technical));
    }

    #[test]
    fn test_normalize_from_47d_marks_aggregated() {
        let detail: Score47D = Category::Emotional.dimensions().map(|k| (k, 40.0)).collect();
        let record = EvaluationRecord::new("a", "A").with_47d(detail);
        let mut rng = StdRng::seed_from_u64(1);
        let normalized = normalize(&record, &mut rng);

        assert_eq!(normalized.provenance.score_6d, ScoreSource::Aggregated);
        assert_eq!(normalized.provenance.score_47d, ScoreSource::Measured);
        assert_eq!(normalized.category_value(Category::Emotional), Some(40.0));
        assert_eq!(normalized.category_value(Category::Impact), None);
        assert_eq!(normalized.overall(), Some(40.0));
        // input untouched
        assert!(record.score_6d.is_none());
    }

    #[test]
    fn test_normalize_without_scores_is_noop() {
        let record = EvaluationRecord::new("empty", "Empty");
        let normalized = normalize(&record, &mut StdRng::seed_from_u64(1));
        assert!(!normalized.is_evaluable());
        assert_eq!(normalized.provenance.score_47d, ScoreSource::Missing);
    }
}
