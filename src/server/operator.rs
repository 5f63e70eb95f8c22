//! Operator Route Handlers
//!
//! Worker control, scenario submission, and the activation flow for a
//! single operator slot. The fleet-wide start/stop endpoints use the
//! slot currently selected in settings.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::polling::{self, ActivationSession, ActivationView};
use crate::types::{OtpSubmission, ProfileWorkerView, Scenario, ScenarioResult};

use super::error::{AppError, AppResult};
use super::AppState;

pub async fn characters(
    State(state): State<AppState>,
    Path(slot): Path<u32>,
) -> AppResult<Json<Vec<ProfileWorkerView>>> {
    let characters = state.api.operator_characters(slot).await?;
    Ok(Json(characters))
}

#[derive(Deserialize)]
pub struct CharacterCommand {
    pub id: String,
    pub command: String,
}

/// Start or stop one character: body `{"id": "...", "command": "start"|"stop"}`.
pub async fn character_command(
    State(state): State<AppState>,
    Path(slot): Path<u32>,
    Json(body): Json<CharacterCommand>,
) -> AppResult<Json<Value>> {
    match body.command.as_str() {
        "start" => state.api.start_character(slot, &body.id).await?,
        "stop" => state.api.stop_character(slot, &body.id).await?,
        other => {
            return Err(AppError::bad_request(format!(
                "unknown character command '{}'",
                other
            )))
        }
    }
    Ok(Json(json!({ "ok": true })))
}

// ── Activation ───────────────────────────────────────────────────

/// Begin an activation session for one profile. Replaces any previous
/// session for the same profile.
pub async fn start_activation(
    State(state): State<AppState>,
    Path((slot, id)): Path<(u32, String)>,
) -> AppResult<Json<ActivationView>> {
    let session = ActivationSession::new(state.api.operator_client(), slot, id.clone(), None);
    session.start().await?;
    state.activations.replace(slot, &id, session.clone());
    Ok(Json(session.view()))
}

pub async fn activation_view(
    State(state): State<AppState>,
    Path((slot, id)): Path<(u32, String)>,
) -> AppResult<Json<ActivationView>> {
    let session = state
        .activations
        .get(slot, &id)
        .ok_or_else(|| AppError::not_found(format!("no activation session for '{}'", id)))?;
    Ok(Json(session.view()))
}

pub async fn submit_activation_otp(
    State(state): State<AppState>,
    Path((slot, id)): Path<(u32, String)>,
    Json(otp): Json<OtpSubmission>,
) -> AppResult<Json<ActivationView>> {
    let session = state
        .activations
        .get(slot, &id)
        .ok_or_else(|| AppError::not_found(format!("no activation session for '{}'", id)))?;
    session.submit_otp(&otp).await?;
    Ok(Json(session.view()))
}

pub async fn cancel_activation(
    State(state): State<AppState>,
    Path((slot, id)): Path<(u32, String)>,
) -> AppResult<Json<Value>> {
    match state.activations.remove(slot, &id) {
        Some(session) => {
            session.cancel();
            Ok(Json(json!({ "ok": true })))
        }
        None => Err(AppError::not_found(format!(
            "no activation session for '{}'",
            id
        ))),
    }
}

// ── Scenarios ────────────────────────────────────────────────────

pub async fn scenarios(
    State(state): State<AppState>,
    Path(slot): Path<u32>,
) -> AppResult<Json<Vec<ScenarioResult>>> {
    let scenarios = state.api.operator_scenarios(slot).await?;
    Ok(Json(scenarios))
}

pub async fn scenario(
    State(state): State<AppState>,
    Path((slot, id)): Path<(u32, String)>,
) -> AppResult<Json<ScenarioResult>> {
    let scenario = state.api.operator_scenario(slot, &id).await?;
    Ok(Json(scenario))
}

pub async fn submit_scenario(
    State(state): State<AppState>,
    Path(slot): Path<u32>,
    Json(scenario): Json<Scenario>,
) -> AppResult<Json<Value>> {
    if scenario.actions.is_empty() {
        return Err(AppError::bad_request("scenario has no actions"));
    }
    let id = state.api.submit_scenario(slot, &scenario).await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn stop_scenario(
    State(state): State<AppState>,
    Path((slot, id)): Path<(u32, String)>,
) -> AppResult<Json<Value>> {
    state.api.stop_scenario(slot, &id).await?;
    Ok(Json(json!({ "ok": true })))
}

// ── Fleet-wide ───────────────────────────────────────────────────

pub async fn start_all(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let slot = state.settings.operator_slot().await;
    state.api.start_all_characters(slot).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Stop the whole fleet and wait (up to 60 s) for every worker to
/// report stopped. A timeout is reported like any other failure.
pub async fn stop_all(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let slot = state.settings.operator_slot().await;
    polling::stop_all_and_wait(&state.api.operator_client(), slot).await?;
    Ok(Json(json!({ "ok": true })))
}
