//! Deal economics
//!
//! The maximum-allowable-offer formula and rehab estimation bands. All
//! functions are pure; negative results are meaningful (an infeasible
//! deal) and are never floored.

use serde::{Deserialize, Serialize};

/// Share of after-repair value a wholesale offer works back from
pub const MAO_ARV_RATIO: f64 = 0.70;

/// Maximum allowable offer: `arv * 0.70 - rehab - assignment fee`
///
/// May be negative; callers decide what an infeasible deal means.
pub fn compute_mao(arv: f64, rehab_estimate: f64, assignment_fee: f64) -> f64 {
    arv * MAO_ARV_RATIO - rehab_estimate - assignment_fee
}

/// Projected assignment profit at a given contract price
pub fn profit_estimate(
    arv: f64,
    contract_price: f64,
    rehab_estimate: f64,
    assignment_fee: f64,
) -> f64 {
    arv - contract_price - rehab_estimate - assignment_fee
}

/// Rehab severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTier {
    /// Paint, carpet, fixtures
    Light,
    /// Kitchen/bath updates, mechanicals
    Moderate,
    /// Full interior renovation
    Heavy,
    /// Foundation or framing work
    Structural,
}

impl ConditionTier {
    /// Dollars-per-square-foot band for this tier
    pub fn band(&self) -> (f64, f64) {
        match self {
            ConditionTier::Light => (10.0, 20.0),
            ConditionTier::Moderate => (25.0, 45.0),
            ConditionTier::Heavy => (50.0, 75.0),
            ConditionTier::Structural => (80.0, 120.0),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConditionTier::Light => "Light",
            ConditionTier::Moderate => "Moderate",
            ConditionTier::Heavy => "Heavy",
            ConditionTier::Structural => "Structural",
        }
    }
}

impl std::fmt::Display for ConditionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Rehab cost range for a property of `sqft` square feet
pub fn estimate_rehab_range(sqft: u32, tier: ConditionTier) -> (f64, f64) {
    let (low, high) = tier.band();
    (sqft as f64 * low, sqft as f64 * high)
}

/// A deal-calculator quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaoQuote {
    pub arv: f64,
    pub rehab_estimate: f64,
    pub assignment_fee: f64,
    pub max_allowable_offer: f64,
    pub profit_at_mao: f64,
    pub seventy_percent_arv: f64,
}

impl MaoQuote {
    /// Quote a deal from its three inputs, figures rounded to cents
    pub fn compute(arv: f64, rehab_estimate: f64, assignment_fee: f64) -> Self {
        let mao = compute_mao(arv, rehab_estimate, assignment_fee);
        Self {
            arv,
            rehab_estimate,
            assignment_fee,
            max_allowable_offer: round_cents(mao),
            profit_at_mao: round_cents(profit_estimate(arv, mao, rehab_estimate, assignment_fee)),
            seventy_percent_arv: round_cents(arv * MAO_ARV_RATIO),
        }
    }
}

/// Round a dollar amount to cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_mao() {
        assert!(close(compute_mao(200_000.0, 35_000.0, 10_000.0), 95_000.0));
        // The seeded reference deal
        assert!(close(compute_mao(180_000.0, 35_000.0, 12_000.0), 79_000.0));
    }

    #[test]
    fn test_mao_can_go_negative() {
        // A burned-down shack is allowed to be a bad deal
        let mao = compute_mao(50_000.0, 60_000.0, 10_000.0);
        assert!(close(mao, -35_000.0));
    }

    #[test]
    fn test_rehab_range() {
        assert_eq!(
            estimate_rehab_range(1500, ConditionTier::Moderate),
            (37_500.0, 67_500.0)
        );
        assert_eq!(
            estimate_rehab_range(1000, ConditionTier::Light),
            (10_000.0, 20_000.0)
        );
        assert_eq!(
            estimate_rehab_range(2000, ConditionTier::Structural),
            (160_000.0, 240_000.0)
        );
    }

    #[test]
    fn test_quote() {
        // Quoted figures are rounded to cents, so exact comparison holds
        let quote = MaoQuote::compute(200_000.0, 35_000.0, 10_000.0);
        assert_eq!(quote.max_allowable_offer, 95_000.0);
        assert_eq!(quote.seventy_percent_arv, 140_000.0);
        assert_eq!(quote.profit_at_mao, 60_000.0);
    }

    #[test]
    fn test_profit_estimate() {
        assert_eq!(
            profit_estimate(180_000.0, 85_000.0, 35_000.0, 12_000.0),
            48_000.0
        );
    }
}
