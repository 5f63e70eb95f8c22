//! Settings Route Handlers

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::settings::SettingsSnapshot;

use super::error::{AppError, AppResult};
use super::AppState;

pub async fn get_slot(State(state): State<AppState>) -> Json<SettingsSnapshot> {
    Json(state.settings.snapshot().await)
}

#[derive(Deserialize)]
pub struct SetSlotBody {
    pub slot: u32,
}

pub async fn set_slot(
    State(state): State<AppState>,
    Json(body): Json<SetSlotBody>,
) -> AppResult<Json<SettingsSnapshot>> {
    let snapshot = state
        .settings
        .set_operator_slot(body.slot)
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok(Json(snapshot))
}
