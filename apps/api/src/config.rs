use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gateway: GatewayConfig,
    pub port: u16,
    pub scheduler_interval_secs: u64,
    pub rust_log: String,
}

/// Calling-provider credentials and the default persona/line, injected into
/// the gateway at construction time — never embedded as fallback literals.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_assistant_id: String,
    pub default_phone_number_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gateway: GatewayConfig {
                api_key: require_env("VAPI_API_KEY")?,
                base_url: std::env::var("VAPI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.vapi.ai".to_string()),
                default_assistant_id: require_env("DEFAULT_ASSISTANT_ID")?,
                default_phone_number_id: require_env("DEFAULT_PHONE_NUMBER_ID")?,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            scheduler_interval_secs: std::env::var("SCHEDULER_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("SCHEDULER_INTERVAL_SECS must be a number of seconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
