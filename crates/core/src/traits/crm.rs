//! CRM store trait

use async_trait::async_trait;

use crate::deal::{Deal, DealStatus};
use crate::error::CrmError;
use crate::lead::{ContactRef, LeadUpdate};
use crate::session::CallRecord;

/// The external CRM store
///
/// The engine reads contact slices and proposes writes; it never assumes a
/// write is immediately visible.
#[async_trait]
pub trait CrmStore: Send + Sync {
    /// Read the orchestration slice of a lead
    async fn get_contact(&self, lead_id: &str) -> Result<Option<ContactRef>, CrmError>;

    /// Create a lead captured mid-call
    async fn create_lead(&self, contact: &ContactRef) -> Result<(), CrmError>;

    /// Apply a field-level lead update
    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<(), CrmError>;

    /// Append a finalized call log entry
    async fn append_call_log(&self, record: &CallRecord) -> Result<(), CrmError>;

    /// Create or replace a deal record
    async fn upsert_deal(&self, deal: &Deal) -> Result<(), CrmError>;

    /// Move a deal through its lifecycle
    async fn update_deal_status(&self, deal_id: &str, status: DealStatus) -> Result<(), CrmError>;
}
