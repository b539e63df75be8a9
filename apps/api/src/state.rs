use std::sync::Arc;

use crate::campaign::runner::CampaignRunner;
use crate::config::Config;
use crate::store::CampaignStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CampaignStore>,
    pub runner: Arc<CampaignRunner>,
    pub config: Config,
}
