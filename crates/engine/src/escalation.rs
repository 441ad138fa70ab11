//! Escalation routing
//!
//! Turns a finalized call outcome into requests to the CRM store and the
//! workflow relay: urgent operator alerts for hot leads, follow-up cadence
//! for warm ones, far-future recontact for cold ones, and permanent
//! exclusion on any do-not-contact signal. Holds no state of its own.

use std::sync::Arc;

use chrono::Utc;

use callflow_core::{
    CallOutcome, CallSession, ContactRef, CrmStore, EventSink, LeadUpdate, PipelineStage,
    RelayEvent, StructuredCallData,
};
use callflow_scoring::MotivationBand;

pub struct EscalationRouter {
    crm: Arc<dyn CrmStore>,
    sink: Arc<dyn EventSink>,
    /// Follow-up cadence for warm leads
    warm_follow_up: chrono::Duration,
    /// Recontact cadence for cold leads
    cold_recontact: chrono::Duration,
}

impl EscalationRouter {
    pub fn new(
        crm: Arc<dyn CrmStore>,
        sink: Arc<dyn EventSink>,
        warm_follow_up_days: i64,
        cold_recontact_days: i64,
    ) -> Self {
        Self {
            crm,
            sink,
            warm_follow_up: chrono::Duration::days(warm_follow_up_days),
            cold_recontact: chrono::Duration::days(cold_recontact_days),
        }
    }

    /// Route a finalized call
    ///
    /// Every effect is a request to a collaborator; failures are logged
    /// and never propagate back into session processing.
    pub async fn route(&self, session: &CallSession, data: &StructuredCallData) {
        let outcome = session.outcome.unwrap_or(CallOutcome::Failed);
        let score = session.motivation_score.unwrap_or(0.0);

        self.deliver(RelayEvent::CallCompleted {
            session_id: session.id.clone(),
            agent_id: session.agent_id.clone(),
            lead_id: session.contact.lead_id.clone(),
            outcome,
            duration_secs: session.duration_secs,
            motivation_score: session.motivation_score,
        })
        .await;

        // A do-not-contact signal from any point in the call wins over
        // everything else, including a hot score.
        if data.do_not_contact
            || session.contact.do_not_contact
            || outcome == CallOutcome::DoNotCall
        {
            self.exclude(&session.contact.lead_id, &session.contact.phone)
                .await;
            return;
        }

        match MotivationBand::classify(score) {
            MotivationBand::Hot => {
                self.deliver(RelayEvent::HotLeadAlert {
                    lead_id: session.contact.lead_id.clone(),
                    name: session.contact.name.clone(),
                    phone: session.contact.phone.clone(),
                    property_address: session.contact.property_address.clone(),
                    motivation_score: score,
                    summary: session.transcript_summary.clone(),
                })
                .await;

                if data.asking_price.is_some() {
                    self.deliver(RelayEvent::DealPackageRequest {
                        lead_id: session.contact.lead_id.clone(),
                        property_address: session.contact.property_address.clone(),
                        asking_price: data.asking_price,
                        motivation_score: score,
                    })
                    .await;
                }

                self.propose(
                    session,
                    Some(PipelineStage::Qualified),
                    LeadUpdate {
                        motivation_score: Some(score),
                        ..touch_update(session)
                    },
                )
                .await;
            }
            MotivationBand::Warm => {
                self.propose(
                    session,
                    Some(PipelineStage::Nurtured),
                    LeadUpdate {
                        motivation_score: Some(score),
                        next_touch_at: Some(Utc::now() + self.warm_follow_up),
                        ..touch_update(session)
                    },
                )
                .await;
            }
            MotivationBand::Cold => {
                // Stage stays where it is; just push the recontact date out
                self.propose(
                    session,
                    None,
                    LeadUpdate {
                        next_touch_at: Some(Utc::now() + self.cold_recontact),
                        ..touch_update(session)
                    },
                )
                .await;
            }
        }
    }

    /// Permanently exclude a lead
    ///
    /// Applied immediately whenever a do-not-contact request is observed,
    /// mid-call or at finalize, and never reversed by automated logic.
    pub async fn exclude(&self, lead_id: &str, phone: &str) {
        if let Err(e) = self.crm.update_lead(lead_id, &LeadUpdate::exclude()).await {
            tracing::warn!(lead_id, error = %e, "exclusion write failed");
        }
        self.deliver(RelayEvent::DoNotContact {
            lead_id: lead_id.to_string(),
            phone: phone.to_string(),
        })
        .await;
        tracing::info!(lead_id, "lead permanently excluded");
    }

    /// Register a lead captured mid-call
    pub async fn capture_lead(&self, contact: &ContactRef) {
        if let Err(e) = self.crm.create_lead(contact).await {
            tracing::warn!(lead_id = %contact.lead_id, error = %e, "lead capture write failed");
        }
        self.deliver(RelayEvent::NewLead {
            lead_id: contact.lead_id.clone(),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            property_address: contact.property_address.clone(),
            territory: contact.territory.clone(),
        })
        .await;
    }

    /// Alert the operator while the call is still live
    pub async fn escalate_live(&self, session: &CallSession) {
        self.deliver(RelayEvent::HotLeadAlert {
            lead_id: session.contact.lead_id.clone(),
            name: session.contact.name.clone(),
            phone: session.contact.phone.clone(),
            property_address: session.contact.property_address.clone(),
            motivation_score: session
                .motivation_score
                .or(session.contact.motivation_score)
                .unwrap_or(callflow_scoring::HOT_THRESHOLD),
            summary: Some("live transfer requested".to_string()),
        })
        .await;
    }

    /// Propose a lead update, honoring forward-only stage movement
    async fn propose(
        &self,
        session: &CallSession,
        stage: Option<PipelineStage>,
        mut update: LeadUpdate,
    ) {
        if let Some(target) = stage {
            if session.contact.stage.can_advance_to(target) {
                update.stage = Some(target);
            }
        }
        if let Err(e) = self
            .crm
            .update_lead(&session.contact.lead_id, &update)
            .await
        {
            tracing::warn!(
                lead_id = %session.contact.lead_id,
                error = %e,
                "lead update write failed"
            );
        }
    }

    async fn deliver(&self, event: RelayEvent) {
        let name = event.name();
        if let Err(e) = self.sink.deliver(event).await {
            tracing::warn!(event = name, error = %e, "relay delivery failed");
        }
    }
}

fn touch_update(session: &CallSession) -> LeadUpdate {
    LeadUpdate {
        assigned_agent: Some(session.agent_id.clone()),
        last_called_at: session.ended_at,
        record_attempt: true,
        ..Default::default()
    }
}
