//! Campaign State Store — the contract the run loop holds against the
//! document store.
//!
//! Three logical collections: `campaigns`, per-campaign `contacts`, and
//! `calls` (mirrored provider call records). The run loop is the sole
//! writer of `Campaign.status` / `contacts_called` during a tick and owns
//! the `called`/`call_id`/`called_at`/`error` fields on contacts.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::call::CallRecord;
use crate::models::campaign::{Campaign, CampaignStatus, Contact};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>, StoreError>;

    /// Fresh status read, bypassing any in-memory copy. The run loop calls
    /// this before every call attempt so an operator force-end mid-tick is
    /// observed promptly.
    async fn fetch_campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignStatus>, StoreError>;

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError>;

    async fn mark_campaign_completed(
        &self,
        campaign_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// All contacts of a campaign, in stable list order.
    async fn list_contacts(&self, campaign_id: &str) -> Result<Vec<Contact>, StoreError>;

    /// Records a successfully placed call on the contact: `call_id`,
    /// `called = true`, `called_at`, and clears any previous error.
    async fn record_call_placed(
        &self,
        campaign_id: &str,
        contact_id: &str,
        call_id: &str,
        called_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Marks the contact `called = "Error"` with the failure message.
    async fn record_contact_error(
        &self,
        campaign_id: &str,
        contact_id: &str,
        message: &str,
        called_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn increment_contacts_called(&self, campaign_id: &str) -> Result<(), StoreError>;

    async fn get_call_record(&self, call_id: &str) -> Result<Option<CallRecord>, StoreError>;

    async fn put_call_record(&self, record: &CallRecord) -> Result<(), StoreError>;

    /// Campaigns the scheduler should consider this tick: `active` or
    /// `in-progress`, with today inside the campaign date range. The date
    /// filter is coarse (UTC day); the run loop re-checks in the campaign's
    /// own timezone.
    async fn list_due_campaigns(&self) -> Result<Vec<Campaign>, StoreError>;
}
