pub mod campaigns;
pub mod health;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Campaign API
        .route(
            "/api/v1/campaigns/:id",
            get(campaigns::handle_get_campaign),
        )
        .route(
            "/api/v1/campaigns/:id/tick",
            post(campaigns::handle_start_tick),
        )
        .route(
            "/api/v1/campaigns/:id/end",
            post(campaigns::handle_end_campaign),
        )
        // Provider webhooks
        .route(
            "/api/v1/webhooks/call-report",
            post(webhooks::handle_call_report),
        )
        .with_state(state)
}
