//! Contact Retry Policy — decides whether a contact should be (re)called.
//!
//! The decision takes a [`CallRecordLookup`] capability instead of a live
//! provider handle, so the table below is unit-testable end to end.
//!
//! Decision table, first match wins:
//! 1. never called, or previous attempt errored → call
//! 2. marked called but no call_id → call (inconsistent state)
//! 3. call record lookup fails → call (provider status unknown, fail open)
//! 4. record says `customer-did-not-answer` → call
//! 5. record's analysis intent is `callback` → call
//! 6. anything else → do not call

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::gateway::{CallingGateway, GatewayError};
use crate::models::call::CallRecord;
use crate::models::campaign::{CalledState, Contact};
use crate::store::CampaignStore;

/// Capability to resolve a call_id into its current [`CallRecord`].
#[async_trait]
pub trait CallRecordLookup: Send + Sync {
    async fn lookup(&self, call_id: &str) -> Result<CallRecord, GatewayError>;
}

/// Production lookup: the `calls` collection first, then the gateway; a
/// freshly fetched record is persisted back so the next tick reads it
/// locally.
pub struct StoredCallLookup<'a> {
    pub store: &'a dyn CampaignStore,
    pub gateway: &'a dyn CallingGateway,
}

#[async_trait]
impl CallRecordLookup for StoredCallLookup<'_> {
    async fn lookup(&self, call_id: &str) -> Result<CallRecord, GatewayError> {
        match self.store.get_call_record(call_id).await {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => {}
            Err(e) => {
                // Fall through to the gateway; a store read failure must
                // not masquerade as a known outcome.
                warn!("Call record read failed for {call_id}: {e}");
            }
        }

        let record = self.gateway.fetch_call(call_id).await?;
        if let Err(e) = self.store.put_call_record(&record).await {
            warn!("Failed to mirror call record {call_id}: {e}");
        }
        Ok(record)
    }
}

/// A terminal outcome that still warrants another attempt: the customer
/// never picked up, or the conversation asked for a callback.
pub fn outcome_is_retryable(record: &CallRecord) -> bool {
    record.rang_out() || record.wants_callback()
}

/// Whether the run loop should place (or re-place) a call for `contact`.
pub async fn should_call(contact: &Contact, lookup: &dyn CallRecordLookup) -> bool {
    match contact.called {
        CalledState::NotCalled | CalledState::Failed => true,
        CalledState::Called => {
            let Some(call_id) = contact.call_id.as_deref() else {
                debug!(
                    "Contact {} marked called without a call_id; treating as never placed",
                    contact.id
                );
                return true;
            };
            match lookup.lookup(call_id).await {
                Ok(record) => outcome_is_retryable(&record),
                Err(e) => {
                    warn!("Call status unknown for contact {} ({call_id}): {e}", contact.id);
                    true
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::call::{CallAnalysis, ENDED_REASON_NO_ANSWER};
    use serde_json::json;
    use std::collections::HashMap;

    struct FixedLookup {
        records: HashMap<String, CallRecord>,
    }

    #[async_trait]
    impl CallRecordLookup for FixedLookup {
        async fn lookup(&self, call_id: &str) -> Result<CallRecord, GatewayError> {
            self.records.get(call_id).cloned().ok_or(GatewayError::Api {
                status: 500,
                message: "lookup failed".to_string(),
            })
        }
    }

    fn lookup_with(records: Vec<CallRecord>) -> FixedLookup {
        FixedLookup {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    fn contact(called: CalledState, call_id: Option<&str>) -> Contact {
        Contact {
            id: "c1".to_string(),
            phone_number: "971501234567".to_string(),
            name: "Amina".to_string(),
            project_name: "Marina Heights".to_string(),
            unit_number: "1204".to_string(),
            called,
            call_id: call_id.map(str::to_string),
            called_at: None,
            error: None,
        }
    }

    fn ended_call(id: &str, reason: &str, intent: Option<&str>) -> CallRecord {
        CallRecord {
            id: id.to_string(),
            status: Some("ended".to_string()),
            ended_reason: Some(reason.to_string()),
            analysis: intent.map(|i| CallAnalysis {
                summary: None,
                structured_data: Some(json!({ "post-call-intent-analysis": i })),
            }),
        }
    }

    #[tokio::test]
    async fn test_never_called_contact_is_called() {
        let lookup = lookup_with(vec![]);
        assert!(should_call(&contact(CalledState::NotCalled, None), &lookup).await);
    }

    #[tokio::test]
    async fn test_errored_contact_is_retried() {
        let lookup = lookup_with(vec![]);
        assert!(should_call(&contact(CalledState::Failed, None), &lookup).await);
    }

    #[tokio::test]
    async fn test_called_without_call_id_is_retried() {
        // Inconsistent state: treat as never successfully placed.
        let lookup = lookup_with(vec![]);
        assert!(should_call(&contact(CalledState::Called, None), &lookup).await);
    }

    #[tokio::test]
    async fn test_unanswered_call_is_retried() {
        let lookup = lookup_with(vec![ended_call("call-1", ENDED_REASON_NO_ANSWER, None)]);
        assert!(should_call(&contact(CalledState::Called, Some("call-1")), &lookup).await);
    }

    #[tokio::test]
    async fn test_callback_intent_is_retried() {
        let lookup = lookup_with(vec![ended_call(
            "call-1",
            "customer-ended-call",
            Some("callback"),
        )]);
        assert!(should_call(&contact(CalledState::Called, Some("call-1")), &lookup).await);
    }

    #[tokio::test]
    async fn test_terminal_outcome_is_not_retried() {
        let lookup = lookup_with(vec![ended_call(
            "call-1",
            "customer-ended-call",
            Some("not-interested"),
        )]);
        assert!(!should_call(&contact(CalledState::Called, Some("call-1")), &lookup).await);
    }

    #[tokio::test]
    async fn test_terminal_outcome_without_analysis_is_not_retried() {
        let lookup = lookup_with(vec![ended_call("call-1", "voicemail", None)]);
        assert!(!should_call(&contact(CalledState::Called, Some("call-1")), &lookup).await);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_open_toward_retry() {
        let lookup = lookup_with(vec![]);
        assert!(should_call(&contact(CalledState::Called, Some("call-unknown")), &lookup).await);
    }

    #[tokio::test]
    async fn test_stored_lookup_prefers_store_over_gateway() {
        use crate::store::memory::MemoryStore;

        struct PanicGateway;

        #[async_trait]
        impl CallingGateway for PanicGateway {
            async fn place_call(
                &self,
                _call: &crate::gateway::OutboundCall,
            ) -> Result<crate::gateway::CallHandle, GatewayError> {
                panic!("place_call must not be reached from a lookup");
            }

            async fn fetch_call(&self, _call_id: &str) -> Result<CallRecord, GatewayError> {
                panic!("store hit must not fall through to the gateway");
            }
        }

        let store = MemoryStore::new();
        store
            .insert_call(ended_call("call-1", "customer-ended-call", None))
            .await;
        let lookup = StoredCallLookup {
            store: &store,
            gateway: &PanicGateway,
        };
        let record = lookup.lookup("call-1").await.unwrap();
        assert_eq!(record.id, "call-1");
    }

    #[tokio::test]
    async fn test_stored_lookup_fetches_and_mirrors_missing_record() {
        use crate::store::memory::MemoryStore;

        struct FetchGateway;

        #[async_trait]
        impl CallingGateway for FetchGateway {
            async fn place_call(
                &self,
                _call: &crate::gateway::OutboundCall,
            ) -> Result<crate::gateway::CallHandle, GatewayError> {
                unreachable!()
            }

            async fn fetch_call(&self, call_id: &str) -> Result<CallRecord, GatewayError> {
                Ok(ended_call(call_id, ENDED_REASON_NO_ANSWER, None))
            }
        }

        let store = MemoryStore::new();
        let lookup = StoredCallLookup {
            store: &store,
            gateway: &FetchGateway,
        };
        let record = lookup.lookup("call-7").await.unwrap();
        assert!(record.rang_out());
        // The fetched record was mirrored into the calls collection.
        assert!(store.get_call_record("call-7").await.unwrap().is_some());
    }
}
