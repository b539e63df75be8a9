//! Tick scheduler — the time-based invocation trigger for the run loop.
//!
//! Fires once per interval, lists due campaigns, and spawns a tick per
//! campaign. Redundant or overlapping firings are safe: the runner's
//! advisory lock turns a duplicate tick into a no-op, and a tick-level
//! failure is logged without touching the scheduler loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::campaign::runner::CampaignRunner;

pub fn spawn(runner: Arc<CampaignRunner>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Campaign scheduler started (interval {interval:?})");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_due_campaigns(&runner).await;
        }
    })
}

async fn run_due_campaigns(runner: &Arc<CampaignRunner>) {
    let due = match runner.store().list_due_campaigns().await {
        Ok(due) => due,
        Err(e) => {
            error!("Scheduler could not list due campaigns: {e}");
            return;
        }
    };

    for campaign in due {
        let runner = Arc::clone(runner);
        tokio::spawn(async move {
            match runner.run_tick(&campaign.id).await {
                Ok(summary) => {
                    if summary.calls_placed > 0 {
                        info!(
                            "Tick for campaign {} placed {} calls ({:?})",
                            campaign.id, summary.calls_placed, summary.outcome
                        );
                    }
                }
                Err(e) => warn!("Tick for campaign {} failed: {e}", campaign.id),
            }
        });
    }
}
