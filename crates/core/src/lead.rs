//! Leads, pipeline stages, and the contact slice the engine works from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a lead came from; doubles as the distress signal vocabulary for
/// motivation scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    TaxDelinquent,
    PreForeclosure,
    Probate,
    CodeViolation,
    AbsenteeOwner,
    Vacant,
    Divorce,
    Inbound,
    /// Catch-all for source tags this engine does not score
    #[serde(other)]
    Other,
}

impl LeadSource {
    pub fn display_name(&self) -> &'static str {
        match self {
            LeadSource::TaxDelinquent => "Tax Delinquent",
            LeadSource::PreForeclosure => "Pre-Foreclosure",
            LeadSource::Probate => "Probate",
            LeadSource::CodeViolation => "Code Violation",
            LeadSource::AbsenteeOwner => "Absentee Owner",
            LeadSource::Vacant => "Vacant",
            LeadSource::Divorce => "Divorce",
            LeadSource::Inbound => "Inbound",
            LeadSource::Other => "Other",
        }
    }
}

impl std::fmt::Display for LeadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Pipeline stage of a lead
///
/// Movement is strictly forward (`new → nurtured → qualified → converted`)
/// except for `excluded`, which may be applied at any point and is never
/// reversed by automated logic. Only an operator override moves a lead
/// backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PipelineStage {
    #[default]
    New,
    Nurtured,
    Qualified,
    Converted,
    Excluded,
}

impl PipelineStage {
    fn rank(&self) -> u8 {
        match self {
            PipelineStage::New => 0,
            PipelineStage::Nurtured => 1,
            PipelineStage::Qualified => 2,
            PipelineStage::Converted => 3,
            PipelineStage::Excluded => u8::MAX,
        }
    }

    /// Whether automated logic may move a lead from `self` to `target`
    pub fn can_advance_to(&self, target: PipelineStage) -> bool {
        if *self == PipelineStage::Excluded {
            return false;
        }
        if target == PipelineStage::Excluded {
            return true;
        }
        target.rank() > self.rank()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineStage::New => "New",
            PipelineStage::Nurtured => "Nurtured",
            PipelineStage::Qualified => "Qualified",
            PipelineStage::Converted => "Converted",
            PipelineStage::Excluded => "Excluded",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The slice of a CRM lead the engine needs to drive a call
///
/// The CRM store owns the full record; this is a read snapshot plus the
/// fields orchestration decisions hang off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRef {
    /// CRM lead ID
    pub lead_id: String,
    /// Owner name
    pub name: String,
    /// Dialable phone number
    pub phone: String,
    /// Property street address
    pub property_address: String,
    /// Territory tag (county)
    pub territory: String,
    /// Source of origin
    pub source: LeadSource,
    /// Current pipeline stage
    #[serde(default)]
    pub stage: PipelineStage,
    /// Motivation score from prior contact, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivation_score: Option<f32>,
    /// Permanent do-not-contact flag
    #[serde(default)]
    pub do_not_contact: bool,
}

/// Explicit field-level lead update proposed to the CRM store
///
/// `None` keeps the stored value; boolean flags and counters are spelled
/// out rather than merged from a loose map so partial updates stay a
/// testable contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivation_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_not_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_called_at: Option<DateTime<Utc>>,
    /// Next scheduled touch (follow-up or recontact cadence)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_touch_at: Option<DateTime<Utc>>,
    /// Increment the attempt counter by one
    #[serde(default)]
    pub record_attempt: bool,
}

impl LeadUpdate {
    /// An update that only proposes a stage change
    pub fn stage(stage: PipelineStage) -> Self {
        Self {
            stage: Some(stage),
            ..Default::default()
        }
    }

    /// The permanent exclusion update
    pub fn exclude() -> Self {
        Self {
            stage: Some(PipelineStage::Excluded),
            do_not_contact: Some(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        assert!(PipelineStage::New.can_advance_to(PipelineStage::Nurtured));
        assert!(PipelineStage::New.can_advance_to(PipelineStage::Qualified));
        assert!(PipelineStage::Nurtured.can_advance_to(PipelineStage::Converted));

        assert!(!PipelineStage::Qualified.can_advance_to(PipelineStage::New));
        assert!(!PipelineStage::Nurtured.can_advance_to(PipelineStage::Nurtured));
        assert!(!PipelineStage::Converted.can_advance_to(PipelineStage::Qualified));
    }

    #[test]
    fn test_exclusion_is_terminal() {
        // Reachable from anywhere
        assert!(PipelineStage::New.can_advance_to(PipelineStage::Excluded));
        assert!(PipelineStage::Converted.can_advance_to(PipelineStage::Excluded));

        // Never reversed by automation
        assert!(!PipelineStage::Excluded.can_advance_to(PipelineStage::New));
        assert!(!PipelineStage::Excluded.can_advance_to(PipelineStage::Qualified));
        assert!(!PipelineStage::Excluded.can_advance_to(PipelineStage::Excluded));
    }

    #[test]
    fn test_exclude_update() {
        let update = LeadUpdate::exclude();
        assert_eq!(update.stage, Some(PipelineStage::Excluded));
        assert_eq!(update.do_not_contact, Some(true));
        assert!(update.motivation_score.is_none());
    }
}
