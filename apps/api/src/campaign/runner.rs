//! Campaign Run Loop — one tick of outbound calling for one campaign.
//!
//! Flow: advisory lock → load campaign + contacts → mark in-progress →
//! window check → per-contact (re-check ended/window → retry policy →
//! place call → persist → pace) → date-based completion check.
//!
//! Error semantics: only a failure to load the campaign or its contact
//! list is a tick failure. Everything per-contact (gateway errors, store
//! write errors) is absorbed, recorded on the contact, and never aborts
//! the batch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::campaign::locks::CampaignLocks;
use crate::campaign::retry::{should_call, StoredCallLookup};
use crate::campaign::window;
use crate::clock::Clock;
use crate::gateway::{CallingGateway, OutboundCall};
use crate::models::campaign::{Campaign, CampaignStatus, Contact, InvalidTransition};
use crate::store::{CampaignStore, StoreError};

/// Inter-call pacing. Defaults mirror the production dialer: one second
/// between calls, a ten-second cooldown after every tenth call, and a
/// short backoff after a per-contact failure.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub inter_call_delay: Duration,
    pub cooldown_every: u32,
    pub cooldown_delay: Duration,
    pub error_backoff: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            inter_call_delay: Duration::from_secs(1),
            cooldown_every: 10,
            cooldown_delay: Duration::from_secs(10),
            error_backoff: Duration::from_secs(2),
        }
    }
}

/// Tick-fatal errors, propagated to the invoking scheduler.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("failed to load campaign state: {0}")]
    Load(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// How a tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A prior tick for this campaign is still running; nothing was done.
    AlreadyRunning,
    CampaignMissing,
    /// The campaign was already `completed` or `ended` at tick start.
    Terminal(CampaignStatus),
    OutsideWindow,
    /// An operator ended the campaign while the loop was running.
    EndedMidRun,
    /// The daily window closed partway through the contact list.
    WindowClosedMidRun,
    /// The contact list was fully processed.
    RanToEnd { completed: bool },
}

#[derive(Debug)]
pub struct TickSummary {
    pub outcome: TickOutcome,
    pub calls_placed: u32,
    pub contacts_skipped: u32,
}

impl TickSummary {
    fn empty(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            calls_placed: 0,
            contacts_skipped: 0,
        }
    }
}

/// Orchestrates campaign ticks. One instance is shared by the scheduler
/// and the manual-trigger route; the embedded [`CampaignLocks`] makes
/// concurrent invocations for the same campaign safe.
pub struct CampaignRunner {
    store: Arc<dyn CampaignStore>,
    gateway: Arc<dyn CallingGateway>,
    clock: Arc<dyn Clock>,
    locks: CampaignLocks,
    pacing: Pacing,
}

impl CampaignRunner {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        gateway: Arc<dyn CallingGateway>,
        clock: Arc<dyn Clock>,
        pacing: Pacing,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            locks: CampaignLocks::new(),
            pacing,
        }
    }

    pub fn store(&self) -> &Arc<dyn CampaignStore> {
        &self.store
    }

    /// Runs one tick for `campaign_id`. Safe to invoke redundantly: a
    /// concurrent tick for the same campaign is skipped, a terminal or
    /// missing campaign is a no-op.
    pub async fn run_tick(&self, campaign_id: &str) -> Result<TickSummary, TickError> {
        let Some(_guard) = self.locks.try_acquire(campaign_id) else {
            info!("Tick for campaign {campaign_id} skipped: a prior tick is still running");
            return Ok(TickSummary::empty(TickOutcome::AlreadyRunning));
        };

        let Some(campaign) = self.store.get_campaign(campaign_id).await? else {
            warn!("Campaign {campaign_id} not found; nothing to do");
            return Ok(TickSummary::empty(TickOutcome::CampaignMissing));
        };

        if campaign.status.is_terminal() {
            info!(
                "Campaign {campaign_id} is {}; no further calls will be placed",
                campaign.status
            );
            return Ok(TickSummary::empty(TickOutcome::Terminal(campaign.status)));
        }

        let contacts = self.store.list_contacts(campaign_id).await?;

        let mut status = campaign.status;
        if status != CampaignStatus::InProgress {
            status = status.transition_to(CampaignStatus::InProgress)?;
            self.store.set_campaign_status(campaign_id, status).await?;
        }

        if !window::is_callable(self.clock.now(), &campaign) {
            info!("Campaign {campaign_id} is outside its calling window");
            return Ok(TickSummary::empty(TickOutcome::OutsideWindow));
        }

        info!(
            "Starting campaign calls for campaign {campaign_id} ({} contacts)",
            contacts.len()
        );

        let lookup = StoredCallLookup {
            store: self.store.as_ref(),
            gateway: self.gateway.as_ref(),
        };

        let mut calls_placed = 0u32;
        let mut contacts_skipped = 0u32;

        for contact in &contacts {
            // Re-read status from the store, not the in-memory copy: an
            // operator can end the campaign mid-tick. A failed read is
            // treated as still running.
            match self.store.fetch_campaign_status(campaign_id).await {
                Ok(Some(CampaignStatus::Ended)) => {
                    info!("Campaign {campaign_id} has been ended; stopping further calls");
                    return Ok(TickSummary {
                        outcome: TickOutcome::EndedMidRun,
                        calls_placed,
                        contacts_skipped,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("Status re-read failed for campaign {campaign_id}: {e}"),
            }

            if !window::is_callable(self.clock.now(), &campaign) {
                info!("Campaign {campaign_id} window closed after {calls_placed} calls");
                return Ok(TickSummary {
                    outcome: TickOutcome::WindowClosedMidRun,
                    calls_placed,
                    contacts_skipped,
                });
            }

            if !should_call(contact, &lookup).await {
                contacts_skipped += 1;
                continue;
            }

            match self.place_and_record(&campaign, contact).await {
                Ok(call_id) => {
                    calls_placed += 1;
                    info!(
                        "Called contact {} on campaign {campaign_id} (call {call_id})",
                        contact.id
                    );

                    tokio::time::sleep(self.pacing.inter_call_delay).await;
                    if self.pacing.cooldown_every > 0
                        && calls_placed % self.pacing.cooldown_every == 0
                    {
                        info!(
                            "Pausing for {:?} after {calls_placed} calls",
                            self.pacing.cooldown_delay
                        );
                        tokio::time::sleep(self.pacing.cooldown_delay).await;
                    }
                }
                Err(message) => {
                    warn!(
                        "Error processing call for contact {} on campaign {campaign_id}: {message}",
                        contact.id
                    );
                    let now = self.clock.now();
                    if let Err(e) = self
                        .store
                        .record_contact_error(campaign_id, &contact.id, &message, now)
                        .await
                    {
                        warn!("Failed to record error on contact {}: {e}", contact.id);
                    }
                    tokio::time::sleep(self.pacing.error_backoff).await;
                }
            }
        }

        // The list was fully processed. The campaign only completes once
        // today (in its own zone) has reached the end date; otherwise it
        // stays in-progress for the next eligible tick.
        let now = self.clock.now();
        if window::is_on_or_after_end_date(now, campaign.campaign_end_date, &campaign.timezone) {
            status.transition_to(CampaignStatus::Completed)?;
            self.store.mark_campaign_completed(campaign_id, now).await?;
            info!("Campaign {campaign_id} completed. Total calls made: {calls_placed}");
            Ok(TickSummary {
                outcome: TickOutcome::RanToEnd { completed: true },
                calls_placed,
                contacts_skipped,
            })
        } else {
            info!(
                "Campaign {campaign_id} pass finished ({calls_placed} calls); \
                 end date not reached, staying in-progress"
            );
            Ok(TickSummary {
                outcome: TickOutcome::RanToEnd { completed: false },
                calls_placed,
                contacts_skipped,
            })
        }
    }

    /// Places the call and persists the result. Returns the error message
    /// to record on the contact when any step fails.
    async fn place_and_record(
        &self,
        campaign: &Campaign,
        contact: &Contact,
    ) -> Result<String, String> {
        let call = OutboundCall {
            phone_number: contact.phone_number.clone(),
            name: contact.name.clone(),
            project_name: contact.project_name.clone(),
            unit_number: contact.unit_number.clone(),
            assistant_id: campaign.assistant_id.clone(),
            phone_number_id: campaign.phone_number_id.clone(),
        };

        let handle = self
            .gateway
            .place_call(&call)
            .await
            .map_err(|e| format!("Failed to place call: {e}"))?;

        let now = self.clock.now();
        self.store
            .record_call_placed(&campaign.id, &contact.id, &handle.id, now)
            .await
            .map_err(|e| format!("Failed to record call {}: {e}", handle.id))?;

        if let Err(e) = self.store.increment_contacts_called(&campaign.id).await {
            // The counter is advisory; marking a successfully-called
            // contact as errored here would force a duplicate call.
            warn!(
                "Failed to bump contacts_called for campaign {}: {e}",
                campaign.id
            );
        }

        Ok(handle.id)
    }
}
