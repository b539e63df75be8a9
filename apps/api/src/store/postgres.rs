//! Postgres-backed [`CampaignStore`].
//!
//! Rows carry `status`/`called` as plain text and are upgraded into the
//! typed domain model on read; a row that fails the upgrade surfaces as
//! [`StoreError::Corrupt`] rather than a silent default.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::models::call::CallRecord;
use crate::models::campaign::{CalledState, Campaign, CampaignStatus, Contact};
use crate::store::{CampaignStore, StoreError};

pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool and wraps it.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct CampaignRow {
    id: String,
    name: String,
    timezone: String,
    start_time: String,
    end_time: String,
    campaign_start_date: NaiveDate,
    campaign_end_date: NaiveDate,
    status: String,
    total_contacts: i32,
    contacts_called: i32,
    assistant_id: Option<String>,
    phone_number_id: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let status: CampaignStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("campaign {}: {e}", row.id)))?;
        Ok(Campaign {
            id: row.id,
            name: row.name,
            timezone: row.timezone,
            start_time: row.start_time,
            end_time: row.end_time,
            campaign_start_date: row.campaign_start_date,
            campaign_end_date: row.campaign_end_date,
            status,
            total_contacts: row.total_contacts,
            contacts_called: row.contacts_called,
            assistant_id: row.assistant_id,
            phone_number_id: row.phone_number_id,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ContactRow {
    id: String,
    phone_number: String,
    name: String,
    project_name: String,
    unit_number: String,
    called: String,
    call_id: Option<String>,
    called_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = StoreError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let called: CalledState = row
            .called
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("contact {}: {e}", row.id)))?;
        Ok(Contact {
            id: row.id,
            phone_number: row.phone_number,
            name: row.name,
            project_name: row.project_name,
            unit_number: row.unit_number,
            called,
            call_id: row.call_id,
            called_at: row.called_at,
            error: row.error,
        })
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>, StoreError> {
        let row: Option<CampaignRow> =
            sqlx::query_as("SELECT * FROM campaigns WHERE id = $1")
                .bind(campaign_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Campaign::try_from).transpose()
    }

    async fn fetch_campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignStatus>, StoreError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM campaigns WHERE id = $1")
                .bind(campaign_id)
                .fetch_optional(&self.pool)
                .await?;
        status
            .map(|s| {
                s.parse()
                    .map_err(|e| StoreError::Corrupt(format!("campaign {campaign_id}: {e}")))
            })
            .transpose()
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE campaigns SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_campaign_completed(
        &self,
        campaign_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE campaigns SET status = 'completed', completed_at = $1 WHERE id = $2")
            .bind(completed_at)
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_contacts(&self, campaign_id: &str) -> Result<Vec<Contact>, StoreError> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            r#"
            SELECT id, phone_number, name, project_name, unit_number,
                   called, call_id, called_at, error
            FROM contacts
            WHERE campaign_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Contact::try_from).collect()
    }

    async fn record_call_placed(
        &self,
        campaign_id: &str,
        contact_id: &str,
        call_id: &str,
        called_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE contacts
            SET called = $1, call_id = $2, called_at = $3, error = NULL
            WHERE campaign_id = $4 AND id = $5
            "#,
        )
        .bind(CalledState::Called.as_str())
        .bind(call_id)
        .bind(called_at)
        .bind(campaign_id)
        .bind(contact_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_contact_error(
        &self,
        campaign_id: &str,
        contact_id: &str,
        message: &str,
        called_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE contacts
            SET called = $1, error = $2, called_at = $3
            WHERE campaign_id = $4 AND id = $5
            "#,
        )
        .bind(CalledState::Failed.as_str())
        .bind(message)
        .bind(called_at)
        .bind(campaign_id)
        .bind(contact_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_contacts_called(&self, campaign_id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE campaigns SET contacts_called = contacts_called + 1 WHERE id = $1")
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_call_record(&self, call_id: &str) -> Result<Option<CallRecord>, StoreError> {
        let record: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT record FROM calls WHERE id = $1")
                .bind(call_id)
                .fetch_optional(&self.pool)
                .await?;
        record
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| StoreError::Corrupt(format!("call {call_id}: {e}")))
            })
            .transpose()
    }

    async fn put_call_record(&self, record: &CallRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)
            .map_err(|e| StoreError::Corrupt(format!("call {}: {e}", record.id)))?;
        sqlx::query(
            r#"
            INSERT INTO calls (id, record)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET record = EXCLUDED.record
            "#,
        )
        .bind(&record.id)
        .bind(&value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_due_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        let rows: Vec<CampaignRow> = sqlx::query_as(
            r#"
            SELECT * FROM campaigns
            WHERE status IN ('active', 'in-progress')
              AND campaign_start_date <= CURRENT_DATE
              AND campaign_end_date >= CURRENT_DATE
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Campaign::try_from).collect()
    }
}
