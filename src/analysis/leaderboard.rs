use serde::{Deserialize, Serialize};

use crate::scoring::EvaluationRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub subject_id: String,
    pub subject_name: String,
    /// Mean of the usable 6D categories
    pub overall: f64,
    /// True when the record's 47D breakdown is synthesized
    pub synthesized: bool,
}

/// Rank subjects by overall score, best first. Ties keep input order;
/// records without usable 6D data are left out.
pub fn leaderboard(records: &[EvaluationRecord]) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(&EvaluationRecord, f64)> =
        records.iter().filter_map(|r| r.overall().map(|o| (r, o))).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (r, overall))| LeaderboardEntry {
            rank: i + 1,
            subject_id: r.subject_id.clone(),
            subject_name: r.subject_name.clone(),
            overall,
            synthesized: r.is_synthesized(),
        })
        .collect()
}
