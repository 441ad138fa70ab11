//! Motivation scoring and deal economics
//!
//! Pure, deterministic, side-effect-free:
//! - Motivation score from fixed factor point tables, with an explicit
//!   overflow policy
//! - Cold/warm/hot classification bands
//! - Maximum-allowable-offer and rehab-range formulas

pub mod economics;
pub mod motivation;

pub use economics::{
    compute_mao, estimate_rehab_range, profit_estimate, round_cents, ConditionTier, MaoQuote,
    MAO_ARV_RATIO,
};
pub use motivation::{
    MotivationBand, ScorePolicy, ScoringEngine, HOT_THRESHOLD, WARM_THRESHOLD,
};
