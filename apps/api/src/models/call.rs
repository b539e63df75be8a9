use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider `endedReason` for a call that rang out unanswered.
pub const ENDED_REASON_NO_ANSWER: &str = "customer-did-not-answer";

/// Post-call analysis intent that requests another attempt.
pub const INTENT_CALLBACK: &str = "callback";

/// Key inside `analysis.structuredData` carrying the detected intent.
const INTENT_FIELD: &str = "post-call-intent-analysis";

/// Outcome of one placed call, as reported by the calling provider.
///
/// Mirrored into the `calls` collection either by the end-of-call-report
/// webhook or by the run loop fetching it directly. Provider fields are
/// camelCase on the wire; everything beyond what the retry policy reads is
/// carried opaquely in `structuredData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    /// Provider-defined, e.g. "queued" | "ringing" | "ended".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        rename = "endedReason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CallAnalysis>,
}

/// Structured post-call analysis attached by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        rename = "structuredData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_data: Option<Value>,
}

impl CallRecord {
    /// The detected post-call intent, if the analysis carries one.
    pub fn intent(&self) -> Option<&str> {
        self.analysis
            .as_ref()
            .and_then(|a| a.structured_data.as_ref())
            .and_then(|data| data.get(INTENT_FIELD))
            .and_then(Value::as_str)
    }

    /// The conversation signaled a desired callback.
    pub fn wants_callback(&self) -> bool {
        self.intent() == Some(INTENT_CALLBACK)
    }

    /// The call ended because the customer never picked up.
    pub fn rang_out(&self) -> bool {
        self.ended_reason.as_deref() == Some(ENDED_REASON_NO_ANSWER)
    }
}
