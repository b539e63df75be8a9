//! Advisory per-campaign locks.
//!
//! Two overlapping ticks for one campaign could double-call a contact in
//! the race between reading `called` and writing `called = true`. The
//! `in-progress` status cannot serve as the guard — it legitimately
//! persists across ticks — so the runner takes an in-process advisory lock
//! instead and skips the tick when one is already held.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct CampaignLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl CampaignLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking acquire. Returns `None` when a tick for this campaign
    /// is already running; the guard releases on drop.
    pub fn try_acquire(&self, campaign_id: &str) -> Option<CampaignLockGuard> {
        let mut held = self.lock_held();
        if held.insert(campaign_id.to_string()) {
            Some(CampaignLockGuard {
                held: Arc::clone(&self.held),
                campaign_id: campaign_id.to_string(),
            })
        } else {
            None
        }
    }

    fn lock_held(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // A poisoned mutex only means another tick panicked mid-insert; the
        // set itself is still a valid HashSet.
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct CampaignLockGuard {
    held: Arc<Mutex<HashSet<String>>>,
    campaign_id: String,
}

impl Drop for CampaignLockGuard {
    fn drop(&mut self) {
        let mut held = self
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        held.remove(&self.campaign_id);
    }
}
