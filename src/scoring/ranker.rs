//! Day Ranker
//!
//! Orders scored days best first. Equal scores go to the earlier date.

use std::cmp::Ordering;

use super::ScoreBreakdown;

#[derive(Debug, Clone, Copy, Default)]
pub struct DayRanker;

impl DayRanker {
    /// Returns the breakdowns sorted by descending final score, earlier
    /// date first on ties. The input slice is left as it was.
    pub fn rank(breakdowns: &[ScoreBreakdown]) -> Vec<&ScoreBreakdown> {
        let mut ranked: Vec<&ScoreBreakdown> = breakdowns.iter().collect();
        ranked.sort_by(|a, b| compare(a, b));
        ranked
    }

    /// Best day, or `None` for an empty input.
    pub fn best(breakdowns: &[ScoreBreakdown]) -> Option<&ScoreBreakdown> {
        breakdowns.iter().min_by(|a, b| compare(a, b))
    }

    /// First `n` entries of [`DayRanker::rank`].
    pub fn top(breakdowns: &[ScoreBreakdown], n: usize) -> Vec<&ScoreBreakdown> {
        let mut ranked = Self::rank(breakdowns);
        ranked.truncate(n);
        ranked
    }
}

fn compare(a: &ScoreBreakdown, b: &ScoreBreakdown) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| a.date.cmp(&b.date))
}
