//! Calling Gateway — the single point of entry for all calling-provider
//! API traffic.
//!
//! No other module may talk to the provider directly; the run loop and the
//! retry policy hold the [`CallingGateway`] trait, not the concrete client.
//! Placing a call is a real-world side effect with at-least-once semantics:
//! a gateway failure always means "contact not called, retry later", never
//! a tick failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::models::call::CallRecord;

/// Bounded per-request timeout so a hung provider call cannot stall a
/// campaign indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Everything needed to place one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    /// Raw digits, no leading '+'.
    pub phone_number: String,
    pub name: String,
    pub project_name: String,
    pub unit_number: String,
    /// Campaign-level persona override; `None` uses the configured default.
    pub assistant_id: Option<String>,
    /// Campaign-level line override; `None` uses the configured default.
    pub phone_number_id: Option<String>,
}

/// Provider acknowledgement of a placed call.
#[derive(Debug, Clone, Deserialize)]
pub struct CallHandle {
    pub id: String,
}

#[async_trait]
pub trait CallingGateway: Send + Sync {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallHandle, GatewayError>;

    async fn fetch_call(&self, call_id: &str) -> Result<CallRecord, GatewayError>;
}

#[derive(Debug, Serialize)]
struct PlaceCallRequest<'a> {
    #[serde(rename = "assistantId")]
    assistant_id: &'a str,
    customer: Customer<'a>,
    #[serde(rename = "phoneNumberId")]
    phone_number_id: &'a str,
    variables: CallVariables<'a>,
}

#[derive(Debug, Serialize)]
struct Customer<'a> {
    number: String,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CallVariables<'a> {
    name: &'a str,
    #[serde(rename = "projectName")]
    project_name: &'a str,
    #[serde(rename = "unitNumber")]
    unit_number: &'a str,
}

/// Reqwest-backed client for the Vapi calling API.
///
/// Credentials and the default assistant/line come from [`GatewayConfig`]
/// at construction time — never from literals in source.
#[derive(Clone)]
pub struct VapiClient {
    client: reqwest::Client,
    config: GatewayConfig,
    base_url: String,
}

impl VapiClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn error_from(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        GatewayError::Api { status, message }
    }
}

#[async_trait]
impl CallingGateway for VapiClient {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallHandle, GatewayError> {
        let body = PlaceCallRequest {
            assistant_id: call
                .assistant_id
                .as_deref()
                .unwrap_or(&self.config.default_assistant_id),
            customer: Customer {
                number: format!("+{}", call.phone_number),
                name: &call.name,
            },
            phone_number_id: call
                .phone_number_id
                .as_deref()
                .unwrap_or(&self.config.default_phone_number_id),
            variables: CallVariables {
                name: &call.name,
                project_name: &call.project_name,
                unit_number: &call.unit_number,
            },
        };

        let response = self
            .client
            .post(format!("{}/call", self.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let handle: CallHandle = response.json().await?;
        debug!("Placed call {} to +{}", handle.id, call.phone_number);
        Ok(handle)
    }

    async fn fetch_call(&self, call_id: &str) -> Result<CallRecord, GatewayError> {
        let response = self
            .client
            .get(format!("{}/call/{call_id}", self.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.json().await?)
    }
}
