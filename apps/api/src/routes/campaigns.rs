use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::campaign::{Campaign, CampaignStatus};
use crate::state::AppState;

/// GET /api/v1/campaigns/:id
pub async fn handle_get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = state
        .store
        .get_campaign(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {id} not found")))?;
    Ok(Json(campaign))
}

/// POST /api/v1/campaigns/:id/tick
///
/// Immediate start: kicks off a tick in the background and returns right
/// away. A tick already running for this campaign is a no-op (advisory
/// lock), so redundant triggers are harmless.
pub async fn handle_start_tick(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let campaign = state
        .store
        .get_campaign(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {id} not found")))?;

    if campaign.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Campaign {id} is {}; no further calls may be placed",
            campaign.status
        )));
    }

    let runner = state.runner.clone();
    tokio::spawn(async move {
        if let Err(e) = runner.run_tick(&id).await {
            warn!("Manually triggered tick for campaign {id} failed: {e}");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Campaign tick started", "status": "started" })),
    ))
}

/// POST /api/v1/campaigns/:id/end
///
/// Operator force-end — the only cancellation primitive. The run loop
/// observes it at its per-contact check points; an in-flight call is never
/// aborted mid-placement.
pub async fn handle_end_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let campaign = state
        .store
        .get_campaign(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {id} not found")))?;

    let ended = campaign
        .status
        .transition_to(CampaignStatus::Ended)
        .map_err(|e| AppError::Conflict(e.to_string()))?;
    state.store.set_campaign_status(&id, ended).await?;

    info!("Campaign {id} ended by operator");
    Ok(Json(json!({ "message": "Campaign ended", "status": "ended" })))
}
