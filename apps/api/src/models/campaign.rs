use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Campaign lifecycle status.
///
/// Transitions are validated through [`CampaignStatus::transition_to`]; the
/// only legal edges are:
///
/// ```text
/// active ⇄ in-progress
/// active → ended
/// in-progress → completed
/// in-progress → ended
/// ```
///
/// `completed` and `ended` are terminal — once a campaign reaches either,
/// no further calls may be placed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CampaignStatus {
    Active,
    InProgress,
    Completed,
    Ended,
}

/// Attempted status transition outside the allowed edges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal campaign status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: CampaignStatus,
    pub to: CampaignStatus,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::InProgress => "in-progress",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Ended => "ended",
        }
    }

    /// Terminal statuses admit no further transitions and no further calls.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Ended)
    }

    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Active, InProgress) | (InProgress, Active) | (InProgress, Completed)
                | (Active, Ended)
                | (InProgress, Ended)
        )
    }

    /// Validated transition. Illegal edges are a typed error, not a silent
    /// state overwrite.
    pub fn transition_to(self, next: CampaignStatus) -> Result<CampaignStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CampaignStatus::Active),
            "in-progress" => Ok(CampaignStatus::InProgress),
            "completed" => Ok(CampaignStatus::Completed),
            "ended" => Ok(CampaignStatus::Ended),
            other => Err(format!("unknown campaign status '{other}'")),
        }
    }
}

/// A configured batch outbound-calling job.
///
/// `start_time`/`end_time` stay as raw `"HH:MM"` strings: the window
/// evaluator parses them per tick and fails closed on malformed values, so
/// a misconfigured campaign never calls anyone instead of crashing the
/// scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    /// IANA zone name, e.g. "Asia/Dubai".
    pub timezone: String,
    pub start_time: String,
    pub end_time: String,
    pub campaign_start_date: NaiveDate,
    pub campaign_end_date: NaiveDate,
    pub status: CampaignStatus,
    pub total_contacts: i32,
    pub contacts_called: i32,
    /// Per-campaign calling persona; falls back to the configured default.
    pub assistant_id: Option<String>,
    /// Per-campaign outbound line; falls back to the configured default.
    pub phone_number_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Tri-state call marker on a contact.
///
/// Wire format (dashboard + document rows): `false`, `true`, or `"Error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalledState {
    #[default]
    NotCalled,
    Called,
    Failed,
}

impl CalledState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalledState::NotCalled => "false",
            CalledState::Called => "true",
            CalledState::Failed => "error",
        }
    }
}

impl FromStr for CalledState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "false" => Ok(CalledState::NotCalled),
            "true" => Ok(CalledState::Called),
            // Dashboard rows carry the capitalized form.
            "error" | "Error" => Ok(CalledState::Failed),
            other => Err(format!("unknown called state '{other}'")),
        }
    }
}

impl Serialize for CalledState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CalledState::NotCalled => serializer.serialize_bool(false),
            CalledState::Called => serializer.serialize_bool(true),
            CalledState::Failed => serializer.serialize_str("Error"),
        }
    }
}

impl<'de> Deserialize<'de> for CalledState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CalledVisitor;

        impl Visitor<'_> for CalledVisitor {
            type Value = CalledState;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean or the string \"Error\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(if v { CalledState::Called } else { CalledState::NotCalled })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CalledVisitor)
    }
}

/// One phone number + call-script metadata within a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    /// Raw digits, no leading '+' — the gateway prepends it.
    pub phone_number: String,
    pub name: String,
    pub project_name: String,
    pub unit_number: String,
    #[serde(default)]
    pub called: CalledState,
    pub call_id: Option<String>,
    pub called_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_oscillates_with_in_progress() {
        let s = CampaignStatus::Active
            .transition_to(CampaignStatus::InProgress)
            .unwrap();
        assert_eq!(s, CampaignStatus::InProgress);
        assert_eq!(
            s.transition_to(CampaignStatus::Active).unwrap(),
            CampaignStatus::Active
        );
    }

    #[test]
    fn test_in_progress_reaches_both_terminals() {
        assert!(CampaignStatus::InProgress
            .transition_to(CampaignStatus::Completed)
            .is_ok());
        assert!(CampaignStatus::InProgress
            .transition_to(CampaignStatus::Ended)
            .is_ok());
    }

    #[test]
    fn test_terminal_statuses_admit_no_edges() {
        for terminal in [CampaignStatus::Completed, CampaignStatus::Ended] {
            for next in [
                CampaignStatus::Active,
                CampaignStatus::InProgress,
                CampaignStatus::Completed,
                CampaignStatus::Ended,
            ] {
                let err = terminal.transition_to(next).unwrap_err();
                assert_eq!(err.from, terminal);
            }
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn test_active_cannot_complete_directly() {
        // Completion only happens at the end of a run, which always passes
        // through in-progress first.
        assert!(CampaignStatus::Active
            .transition_to(CampaignStatus::Completed)
            .is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for s in [
            CampaignStatus::Active,
            CampaignStatus::InProgress,
            CampaignStatus::Completed,
            CampaignStatus::Ended,
        ] {
            assert_eq!(s.as_str().parse::<CampaignStatus>().unwrap(), s);
        }
    }

    #[test]
    fn test_status_serde_uses_kebab_case() {
        let json = serde_json::to_string(&CampaignStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let back: CampaignStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(back, CampaignStatus::InProgress);
    }

    #[test]
    fn test_called_state_serializes_tri_state() {
        assert_eq!(
            serde_json::to_value(CalledState::NotCalled).unwrap(),
            serde_json::json!(false)
        );
        assert_eq!(
            serde_json::to_value(CalledState::Called).unwrap(),
            serde_json::json!(true)
        );
        assert_eq!(
            serde_json::to_value(CalledState::Failed).unwrap(),
            serde_json::json!("Error")
        );
    }

    #[test]
    fn test_called_state_deserializes_tri_state() {
        let not_called: CalledState = serde_json::from_str("false").unwrap();
        let called: CalledState = serde_json::from_str("true").unwrap();
        let failed: CalledState = serde_json::from_str("\"Error\"").unwrap();
        assert_eq!(not_called, CalledState::NotCalled);
        assert_eq!(called, CalledState::Called);
        assert_eq!(failed, CalledState::Failed);
    }

    #[test]
    fn test_called_state_rejects_unknown_string() {
        let result: Result<CalledState, _> = serde_json::from_str("\"maybe\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_contact_called_defaults_to_not_called() {
        let json = serde_json::json!({
            "id": "c1",
            "phone_number": "971501234567",
            "name": "Amina",
            "project_name": "Marina Heights",
            "unit_number": "1204",
            "call_id": null,
            "called_at": null,
            "error": null
        });
        let contact: Contact = serde_json::from_value(json).unwrap();
        assert_eq!(contact.called, CalledState::NotCalled);
    }
}
