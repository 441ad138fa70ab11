//! CRM store implementations
//!
//! `MemoryCrmStore` backs dev and tests; `HttpCrmStore` talks to the
//! hosted CRM's REST API. Both sit behind the `CrmStore` trait and both
//! are treated as eventually consistent by the engine.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;

use callflow_config::CrmConfig;
use callflow_core::{
    CallRecord, ContactRef, CrmError, CrmStore, Deal, DealStatus, LeadUpdate,
};

/// One lead as the store keeps it
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub contact: ContactRef,
    pub total_attempts: u32,
    pub assigned_agent: Option<String>,
    pub last_called_at: Option<DateTime<Utc>>,
    pub next_touch_at: Option<DateTime<Utc>>,
}

impl LeadRecord {
    fn new(contact: ContactRef) -> Self {
        Self {
            contact,
            total_attempts: 0,
            assigned_agent: None,
            last_called_at: None,
            next_touch_at: None,
        }
    }

    fn apply(&mut self, update: &LeadUpdate) {
        if let Some(stage) = update.stage {
            self.contact.stage = stage;
        }
        if let Some(score) = update.motivation_score {
            self.contact.motivation_score = Some(score);
        }
        if let Some(dnc) = update.do_not_contact {
            self.contact.do_not_contact = dnc;
        }
        if let Some(ref agent) = update.assigned_agent {
            self.assigned_agent = Some(agent.clone());
        }
        if let Some(at) = update.last_called_at {
            self.last_called_at = Some(at);
        }
        if let Some(at) = update.next_touch_at {
            self.next_touch_at = Some(at);
        }
        if update.record_attempt {
            self.total_attempts += 1;
        }
    }
}

/// In-memory CRM store
#[derive(Default)]
pub struct MemoryCrmStore {
    leads: RwLock<HashMap<String, LeadRecord>>,
    call_logs: RwLock<Vec<CallRecord>>,
    deals: RwLock<HashMap<String, Deal>>,
}

impl MemoryCrmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lead directly (dev/test)
    pub fn insert_lead(&self, contact: ContactRef) {
        self.leads
            .write()
            .insert(contact.lead_id.clone(), LeadRecord::new(contact));
    }

    pub fn lead_record(&self, lead_id: &str) -> Option<LeadRecord> {
        self.leads.read().get(lead_id).cloned()
    }

    pub fn call_logs(&self) -> Vec<CallRecord> {
        self.call_logs.read().clone()
    }

    pub fn deal(&self, deal_id: &str) -> Option<Deal> {
        self.deals.read().get(deal_id).cloned()
    }
}

#[async_trait]
impl CrmStore for MemoryCrmStore {
    async fn get_contact(&self, lead_id: &str) -> Result<Option<ContactRef>, CrmError> {
        Ok(self.leads.read().get(lead_id).map(|r| r.contact.clone()))
    }

    async fn create_lead(&self, contact: &ContactRef) -> Result<(), CrmError> {
        self.leads
            .write()
            .insert(contact.lead_id.clone(), LeadRecord::new(contact.clone()));
        Ok(())
    }

    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<(), CrmError> {
        let mut leads = self.leads.write();
        let record = leads
            .get_mut(lead_id)
            .ok_or_else(|| CrmError::NotFound(lead_id.to_string()))?;
        record.apply(update);
        Ok(())
    }

    async fn append_call_log(&self, record: &CallRecord) -> Result<(), CrmError> {
        self.call_logs.write().push(record.clone());
        Ok(())
    }

    async fn upsert_deal(&self, deal: &Deal) -> Result<(), CrmError> {
        self.deals.write().insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn update_deal_status(&self, deal_id: &str, status: DealStatus) -> Result<(), CrmError> {
        let mut deals = self.deals.write();
        let deal = deals
            .get_mut(deal_id)
            .ok_or_else(|| CrmError::NotFound(deal_id.to_string()))?;
        deal.status = status;
        Ok(())
    }
}

/// REST CRM client
pub struct HttpCrmStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCrmStore {
    pub fn new(config: &CrmConfig) -> Result<Option<Self>, CrmError> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CrmError::Store(format!("failed to create HTTP client: {}", e)))?;

        Ok(Some(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        }))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.endpoint.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CrmError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| CrmError::Store(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CrmError::NotFound(response.url().path().to_string()));
        }
        if !response.status().is_success() {
            return Err(CrmError::Store(format!(
                "CRM returned {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl CrmStore for HttpCrmStore {
    async fn get_contact(&self, lead_id: &str) -> Result<Option<ContactRef>, CrmError> {
        let request = self.client.get(self.api_url(&format!("/leads/{}", lead_id)));
        match self.send(request).await {
            Ok(response) => {
                let contact = response
                    .json()
                    .await
                    .map_err(|e| CrmError::Store(format!("invalid lead response: {}", e)))?;
                Ok(Some(contact))
            }
            Err(CrmError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_lead(&self, contact: &ContactRef) -> Result<(), CrmError> {
        let request = self.client.post(self.api_url("/leads")).json(contact);
        self.send(request).await?;
        Ok(())
    }

    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<(), CrmError> {
        let request = self
            .client
            .patch(self.api_url(&format!("/leads/{}", lead_id)))
            .json(update);
        self.send(request).await?;
        Ok(())
    }

    async fn append_call_log(&self, record: &CallRecord) -> Result<(), CrmError> {
        let request = self.client.post(self.api_url("/calls")).json(record);
        self.send(request).await?;
        Ok(())
    }

    async fn upsert_deal(&self, deal: &Deal) -> Result<(), CrmError> {
        let request = self.client.post(self.api_url("/deals")).json(deal);
        self.send(request).await?;
        Ok(())
    }

    async fn update_deal_status(&self, deal_id: &str, status: DealStatus) -> Result<(), CrmError> {
        let request = self
            .client
            .patch(self.api_url(&format!("/deals/{}", deal_id)))
            .json(&serde_json::json!({ "status": status }));
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_core::{LeadSource, PipelineStage};

    fn contact(id: &str) -> ContactRef {
        ContactRef {
            lead_id: id.to_string(),
            name: "Maria Garcia".into(),
            phone: "+12815552345".into(),
            property_address: "5678 Oak Ave".into(),
            territory: "Fort Bend".into(),
            source: LeadSource::Probate,
            stage: PipelineStage::New,
            motivation_score: None,
            do_not_contact: false,
        }
    }

    #[tokio::test]
    async fn test_memory_store_lead_updates() {
        let store = MemoryCrmStore::new();
        store.insert_lead(contact("l1"));

        store
            .update_lead(
                "l1",
                &LeadUpdate {
                    stage: Some(PipelineStage::Nurtured),
                    motivation_score: Some(5.5),
                    record_attempt: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = store.lead_record("l1").unwrap();
        assert_eq!(record.contact.stage, PipelineStage::Nurtured);
        assert_eq!(record.contact.motivation_score, Some(5.5));
        assert_eq!(record.total_attempts, 1);

        // Untouched fields survive a partial update
        assert_eq!(record.contact.phone, "+12815552345");
    }

    #[tokio::test]
    async fn test_memory_store_unknown_lead() {
        let store = MemoryCrmStore::new();
        assert!(store.get_contact("ghost").await.unwrap().is_none());
        assert!(matches!(
            store.update_lead("ghost", &LeadUpdate::default()).await,
            Err(CrmError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_deals() {
        let store = MemoryCrmStore::new();
        let deal = Deal {
            id: "d1".into(),
            lead_id: "l1".into(),
            property_address: "5678 Oak Ave".into(),
            arv: 180_000.0,
            rehab_estimate: 35_000.0,
            contract_price: 85_000.0,
            assignment_fee: 12_000.0,
            max_allowable_offer: 79_000.0,
            profit_estimate: 48_000.0,
            status: DealStatus::Negotiating,
            created_at: Utc::now(),
        };
        store.upsert_deal(&deal).await.unwrap();

        store
            .update_deal_status("d1", DealStatus::Contracted)
            .await
            .unwrap();
        assert_eq!(store.deal("d1").unwrap().status, DealStatus::Contracted);
    }

    #[test]
    fn test_http_store_optional() {
        let store = HttpCrmStore::new(&CrmConfig::default()).unwrap();
        assert!(store.is_none());
    }
}
