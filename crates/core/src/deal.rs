//! Deal economics records derived for qualified leads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum DealStatus {
    #[default]
    Negotiating,
    Contracted,
    Disposition,
    Closed,
    Dead,
}

impl DealStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            DealStatus::Negotiating => "Negotiating",
            DealStatus::Contracted => "Contracted",
            DealStatus::Disposition => "Disposition",
            DealStatus::Closed => "Closed",
            DealStatus::Dead => "Dead",
        }
    }

    /// Terminal statuses leave the active pipeline
    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Closed | DealStatus::Dead)
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Derived economic record for a qualified lead
///
/// Owned by the CRM store; the engine computes the derived figures and
/// proposes writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub lead_id: String,
    pub property_address: String,
    /// After-repair value estimate
    pub arv: f64,
    pub rehab_estimate: f64,
    pub contract_price: f64,
    pub assignment_fee: f64,
    /// Computed ceiling; may be negative for infeasible deals
    pub max_allowable_offer: f64,
    pub profit_estimate: f64,
    #[serde(default)]
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
}
