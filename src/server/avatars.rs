//! Avatar Route Handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{Avatar, CombinedAvatar, PatchAvatar, Proxy, Web1Account};
use crate::web1;

use super::error::{AppError, AppResult};
use super::AppState;

/// Full avatar list joined with live worker state for the current slot.
pub async fn list_combined(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CombinedAvatar>>> {
    let slot = state.settings.operator_slot().await;
    let combined = state.api.combined_avatars(slot).await?;
    Ok(Json(combined))
}

pub async fn patch_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PatchAvatar>,
) -> AppResult<Json<Avatar>> {
    if patch.path.is_empty() {
        return Err(AppError::bad_request("patch path must not be empty"));
    }
    let avatar = state.api.patch_avatar(&id, &patch).await?;
    Ok(Json(avatar))
}

#[derive(Deserialize)]
pub struct AssignProxyBody {
    pub proxy_id: String,
}

pub async fn assign_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AssignProxyBody>,
) -> AppResult<Json<Value>> {
    state.api.assign_proxy(&id, &body.proxy_id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn unassign_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.api.unassign_proxy(&id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_proxies(State(state): State<AppState>) -> AppResult<Json<Vec<Proxy>>> {
    let proxies = state.api.list_proxies().await?;
    Ok(Json(proxies))
}

/// Pick an unused WEB1 account for an allow-listed country. Responds
/// with `null` when no account qualifies; that is not an error.
pub async fn assign_web1(
    State(state): State<AppState>,
) -> AppResult<Json<Option<Web1Account>>> {
    let path = state
        .web1_path
        .as_ref()
        .ok_or_else(|| AppError::bad_request("WEB1_DATA_PATH is not configured"))?;

    let accounts = web1::load_accounts(path)?;
    let used = state.api.used_phone_numbers().await?;
    let picked = web1::assign_web1_account(&accounts, &state.allowed_countries, &used);
    Ok(Json(picked.cloned()))
}
