use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::call::{CallAnalysis, CallRecord};
use crate::state::AppState;

/// Provider webhook envelope. Only `end-of-call-report` messages carry a
/// call outcome; everything else is acknowledged and ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub message: WebhookMessage,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub call: Option<CallRef>,
    #[serde(rename = "endedReason")]
    pub ended_reason: Option<String>,
    pub analysis: Option<CallAnalysis>,
}

#[derive(Debug, Deserialize)]
pub struct CallRef {
    pub id: String,
}

/// POST /api/v1/webhooks/call-report
///
/// Mirrors the provider's end-of-call report into the `calls` collection,
/// where the retry policy reads it on the next tick.
pub async fn handle_call_report(
    State(state): State<AppState>,
    Json(envelope): Json<WebhookEnvelope>,
) -> Result<Json<Value>, AppError> {
    let message = envelope.message;
    if message.kind == "end-of-call-report" {
        if let Some(call) = message.call {
            let record = CallRecord {
                id: call.id,
                status: Some("ended".to_string()),
                ended_reason: message.ended_reason,
                analysis: message.analysis,
            };
            state.store.put_call_record(&record).await?;
            info!("Stored call report for call {}", record.id);
        }
    }

    Ok(Json(json!({ "message": "Call status updated successfully" })))
}
