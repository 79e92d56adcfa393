//! Scoring Module
//!
//! Heuristic flying-suitability scores for daily weather records and the
//! ranking of scored days. Not a substitute for aviation weather minima.

mod engine;
mod ranker;

pub use engine::{
    Category, Factor, FactorAdjustment, FlightScoringEngine, ScoreBreakdown, BASE_SCORE,
};
pub use ranker::DayRanker;
