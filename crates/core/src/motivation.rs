//! Inputs to motivation scoring
//!
//! The scoring functions themselves live in `callflow-scoring`; these are
//! the factor types shared between the engine, the provider's structured
//! call data, and the scorer.

use serde::{Deserialize, Serialize};

use crate::lead::LeadSource;

/// Property type bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PropertyKind {
    #[default]
    SingleFamily,
    MultiFamily,
    Townhome,
    Condo,
    MobileHome,
    Land,
}

/// Observed property attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyFacts {
    #[serde(default)]
    pub kind: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<u32>,
    #[serde(default)]
    pub is_vacant: bool,
}

/// Coarse demand level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum DemandLevel {
    Low,
    #[default]
    Moderate,
    High,
}

/// Market context for the property's area
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketContext {
    /// Year-over-year appreciation, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appreciation_pct: Option<f32>,
    #[serde(default)]
    pub rental_demand: DemandLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_on_market: Option<u32>,
}

/// The full factor set a motivation score is computed from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotivationFactors {
    /// Distress signals attached to the lead (source tags)
    #[serde(default)]
    pub signals: Vec<LeadSource>,
    #[serde(default)]
    pub property: PropertyFacts,
    #[serde(default)]
    pub market: MarketContext,
}

/// Structured facts collected by the calling script during a conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredCallData {
    /// Factor observations gathered on the call
    #[serde(default)]
    pub factors: MotivationFactors,
    /// Seller-stated asking price, if one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asking_price: Option<f64>,
    /// Contact asked to never be called again
    #[serde(default)]
    pub do_not_contact: bool,
    /// Contact asked for a callback
    #[serde(default)]
    pub callback_requested: bool,
}
