//! In-memory [`CampaignStore`] used by run-loop and retry-policy tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::call::CallRecord;
use crate::models::campaign::{CalledState, Campaign, CampaignStatus, Contact};
use crate::store::{CampaignStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    campaigns: Mutex<HashMap<String, Campaign>>,
    contacts: Mutex<HashMap<String, Vec<Contact>>>,
    calls: Mutex<HashMap<String, CallRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_campaign(&self, campaign: Campaign) {
        self.campaigns
            .lock()
            .await
            .insert(campaign.id.clone(), campaign);
    }

    pub async fn insert_contacts(&self, campaign_id: &str, contacts: Vec<Contact>) {
        self.contacts
            .lock()
            .await
            .insert(campaign_id.to_string(), contacts);
    }

    pub async fn insert_call(&self, record: CallRecord) {
        self.calls.lock().await.insert(record.id.clone(), record);
    }

    pub async fn campaign(&self, campaign_id: &str) -> Option<Campaign> {
        self.campaigns.lock().await.get(campaign_id).cloned()
    }

    pub async fn contacts_snapshot(&self, campaign_id: &str) -> Vec<Contact> {
        self.contacts
            .lock()
            .await
            .get(campaign_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn call_records(&self) -> Vec<CallRecord> {
        self.calls.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>, StoreError> {
        Ok(self.campaigns.lock().await.get(campaign_id).cloned())
    }

    async fn fetch_campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignStatus>, StoreError> {
        Ok(self
            .campaigns
            .lock()
            .await
            .get(campaign_id)
            .map(|c| c.status))
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        if let Some(campaign) = self.campaigns.lock().await.get_mut(campaign_id) {
            campaign.status = status;
        }
        Ok(())
    }

    async fn mark_campaign_completed(
        &self,
        campaign_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(campaign) = self.campaigns.lock().await.get_mut(campaign_id) {
            campaign.status = CampaignStatus::Completed;
            campaign.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn list_contacts(&self, campaign_id: &str) -> Result<Vec<Contact>, StoreError> {
        Ok(self.contacts_snapshot(campaign_id).await)
    }

    async fn record_call_placed(
        &self,
        campaign_id: &str,
        contact_id: &str,
        call_id: &str,
        called_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(contacts) = self.contacts.lock().await.get_mut(campaign_id) {
            if let Some(contact) = contacts.iter_mut().find(|c| c.id == contact_id) {
                contact.called = CalledState::Called;
                contact.call_id = Some(call_id.to_string());
                contact.called_at = Some(called_at);
                contact.error = None;
            }
        }
        Ok(())
    }

    async fn record_contact_error(
        &self,
        campaign_id: &str,
        contact_id: &str,
        message: &str,
        called_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(contacts) = self.contacts.lock().await.get_mut(campaign_id) {
            if let Some(contact) = contacts.iter_mut().find(|c| c.id == contact_id) {
                contact.called = CalledState::Failed;
                contact.error = Some(message.to_string());
                contact.called_at = Some(called_at);
            }
        }
        Ok(())
    }

    async fn increment_contacts_called(&self, campaign_id: &str) -> Result<(), StoreError> {
        if let Some(campaign) = self.campaigns.lock().await.get_mut(campaign_id) {
            campaign.contacts_called += 1;
        }
        Ok(())
    }

    async fn get_call_record(&self, call_id: &str) -> Result<Option<CallRecord>, StoreError> {
        Ok(self.calls.lock().await.get(call_id).cloned())
    }

    async fn put_call_record(&self, record: &CallRecord) -> Result<(), StoreError> {
        self.insert_call(record.clone()).await;
        Ok(())
    }

    async fn list_due_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        Ok(self
            .campaigns
            .lock()
            .await
            .values()
            .filter(|c| !c.status.is_terminal())
            .cloned()
            .collect())
    }
}
