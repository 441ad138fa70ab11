//! Motivation scoring
//!
//! Maps contact and property attributes to a 0–10 motivation score from
//! fixed point tables. Three independent factor groups contribute, each
//! capped, and an explicit policy settles what happens when the raw sum
//! exceeds the scale.

use serde::{Deserialize, Serialize};

use callflow_core::{DemandLevel, LeadSource, MarketContext, MotivationFactors, PropertyFacts,
    PropertyKind};

/// Per-group contribution caps
const SIGNALS_CAP: f32 = 6.0;
const PROPERTY_CAP: f32 = 3.5;
const MARKET_CAP: f32 = 2.5;

/// Band thresholds; a hard contract consumed by escalation routing
pub const HOT_THRESHOLD: f32 = 7.0;
pub const WARM_THRESHOLD: f32 = 4.0;

/// Policy for raw sums that overflow the 0–10 scale
///
/// The capped group sums can reach 12.0; `Clamp` keeps the absolute point
/// semantics the band thresholds were calibrated against, `Rescale` maps
/// the whole range proportionally instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[derive(Default)]
pub enum ScorePolicy {
    #[default]
    Clamp,
    Rescale {
        ceiling: f32,
    },
}

impl ScorePolicy {
    /// Map a raw point sum onto the 0–10 scale
    pub fn apply(&self, raw: f32) -> f32 {
        match *self {
            ScorePolicy::Clamp => raw.clamp(0.0, 10.0),
            ScorePolicy::Rescale { ceiling } if ceiling > 0.0 => {
                (raw * 10.0 / ceiling).clamp(0.0, 10.0)
            }
            // A non-positive ceiling is a misconfiguration; fall back to clamping
            ScorePolicy::Rescale { .. } => raw.clamp(0.0, 10.0),
        }
    }
}

/// Motivation band consumed by escalation routing and stage defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationBand {
    Cold,
    Warm,
    Hot,
}

impl MotivationBand {
    /// score ≥ 7 ⇒ hot, 4–6 ⇒ warm, else cold
    pub fn classify(score: f32) -> Self {
        if score >= HOT_THRESHOLD {
            MotivationBand::Hot
        } else if score >= WARM_THRESHOLD {
            MotivationBand::Warm
        } else {
            MotivationBand::Cold
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MotivationBand::Cold => "Cold",
            MotivationBand::Warm => "Warm",
            MotivationBand::Hot => "Hot",
        }
    }
}

impl std::fmt::Display for MotivationBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The scoring engine
///
/// Pure and deterministic; the only state is the configured overflow
/// policy.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    policy: ScorePolicy,
}

impl ScoringEngine {
    pub fn new(policy: ScorePolicy) -> Self {
        Self { policy }
    }

    /// Compute the motivation score for a factor set, in [0, 10]
    pub fn score(&self, factors: &MotivationFactors) -> f32 {
        let raw = signal_points(&factors.signals)
            + property_points(&factors.property)
            + market_points(&factors.market);
        self.policy.apply(raw)
    }

    /// Classify a score into a routing band
    pub fn classify(&self, score: f32) -> MotivationBand {
        MotivationBand::classify(score)
    }
}

fn signal_points(signals: &[LeadSource]) -> f32 {
    let sum: f32 = signals.iter().map(|s| signal_value(*s)).sum();
    sum.min(SIGNALS_CAP)
}

fn signal_value(signal: LeadSource) -> f32 {
    match signal {
        LeadSource::PreForeclosure => 3.5,
        LeadSource::TaxDelinquent => 3.0,
        LeadSource::Probate => 2.5,
        LeadSource::Vacant => 2.5,
        LeadSource::CodeViolation => 2.0,
        LeadSource::Divorce => 2.0,
        LeadSource::AbsenteeOwner => 1.5,
        LeadSource::Inbound => 1.0,
        LeadSource::Other => 0.5,
    }
}

fn property_points(property: &PropertyFacts) -> f32 {
    let kind: f32 = match property.kind {
        PropertyKind::MultiFamily => 1.2,
        PropertyKind::SingleFamily => 1.0,
        PropertyKind::Townhome | PropertyKind::MobileHome => 0.8,
        PropertyKind::Condo => 0.6,
        PropertyKind::Land => 0.4,
    };

    let age = match property.year_built {
        Some(year) if year <= 1985 => 1.0,
        Some(year) if year <= 2005 => 0.5,
        _ => 0.0,
    };

    let size = match property.sqft {
        Some(sqft) if (1000..=2500).contains(&sqft) => 0.6,
        Some(sqft) if sqft > 2500 => 0.4,
        Some(_) => 0.3,
        None => 0.0,
    };

    let vacancy = if property.is_vacant { 1.0 } else { 0.0 };

    (kind + age + size + vacancy).min(PROPERTY_CAP)
}

fn market_points(market: &MarketContext) -> f32 {
    let appreciation: f32 = match market.appreciation_pct {
        Some(pct) if pct >= 5.0 => 1.0,
        Some(pct) if pct >= 2.0 => 0.5,
        _ => 0.0,
    };

    let demand = match market.rental_demand {
        DemandLevel::High => 1.0,
        DemandLevel::Moderate => 0.5,
        DemandLevel::Low => 0.0,
    };

    let staleness = match market.days_on_market {
        Some(days) if days > 90 => 0.5,
        _ => 0.0,
    };

    (appreciation + demand + staleness).min(MARKET_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_factors() -> MotivationFactors {
        MotivationFactors {
            signals: vec![
                LeadSource::PreForeclosure,
                LeadSource::TaxDelinquent,
                LeadSource::Probate,
                LeadSource::Vacant,
            ],
            property: PropertyFacts {
                kind: PropertyKind::MultiFamily,
                year_built: Some(1962),
                sqft: Some(1800),
                is_vacant: true,
            },
            market: MarketContext {
                appreciation_pct: Some(7.5),
                rental_demand: DemandLevel::High,
                days_on_market: Some(120),
            },
        }
    }

    #[test]
    fn test_score_stays_in_range() {
        let engine = ScoringEngine::default();

        // Defaults: single-family kind (1.0) + moderate demand (0.5)
        assert_eq!(engine.score(&MotivationFactors::default()), 1.5);
        assert!(engine.score(&loaded_factors()) <= 10.0);
        assert!(engine.score(&loaded_factors()) >= 0.0);

        // The raw sum overflows 10; clamping pins it to the top of the scale
        assert_eq!(engine.score(&loaded_factors()), 10.0);
    }

    #[test]
    fn test_rescale_policy() {
        // Raw = 6.0 (signals cap) + 3.5 (property cap) + 2.0 = 11.5
        let mut factors = loaded_factors();
        factors.market.days_on_market = Some(30);

        let engine = ScoringEngine::new(ScorePolicy::Rescale { ceiling: 12.0 });
        let score = engine.score(&factors);
        assert!(score < 10.0);
        assert!(score > 9.0);

        // Misconfigured ceiling degrades to clamping
        let engine = ScoringEngine::new(ScorePolicy::Rescale { ceiling: 0.0 });
        assert_eq!(engine.score(&factors), 10.0);
    }

    #[test]
    fn test_group_caps() {
        let engine = ScoringEngine::default();
        let factors = MotivationFactors {
            signals: vec![LeadSource::PreForeclosure; 10],
            ..Default::default()
        };
        // Ten stacked signals cap at the group ceiling; defaults add 1.5
        assert_eq!(engine.score(&factors), SIGNALS_CAP + 1.5);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(MotivationBand::classify(7.0), MotivationBand::Hot);
        assert_eq!(MotivationBand::classify(6.999), MotivationBand::Warm);
        assert_eq!(MotivationBand::classify(4.0), MotivationBand::Warm);
        assert_eq!(MotivationBand::classify(3.999), MotivationBand::Cold);
        assert_eq!(MotivationBand::classify(0.0), MotivationBand::Cold);
        assert_eq!(MotivationBand::classify(10.0), MotivationBand::Hot);
    }

    #[test]
    fn test_policy_serde() {
        let policy: ScorePolicy = serde_json::from_str(r#"{"mode": "clamp"}"#).unwrap();
        assert_eq!(policy, ScorePolicy::Clamp);

        let policy: ScorePolicy =
            serde_json::from_str(r#"{"mode": "rescale", "ceiling": 12.0}"#).unwrap();
        assert_eq!(policy, ScorePolicy::Rescale { ceiling: 12.0 });
    }
}
