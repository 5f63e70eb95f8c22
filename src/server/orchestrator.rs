//! Orchestrator Route Handlers
//!
//! Mission, category, and chat endpoints. Statistics responses are
//! post-processed so every known datetime field is either normalized
//! RFC 3339 or null, never garbage.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aggregate;
use crate::types::{
    Category, ChatsWithCategories, Mission, NewMission, NormalizedChat, OrchestratorCharacter,
    ResolvePhoneUpload, Scenario,
};

use super::error::{AppError, AppResult};
use super::AppState;

pub async fn characters(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OrchestratorCharacter>>> {
    let characters = state.api.orchestrator_characters().await?;
    Ok(Json(characters))
}

#[derive(Deserialize)]
pub struct AddCharactersBody {
    pub ids: Vec<String>,
}

pub async fn add_characters(
    State(state): State<AppState>,
    Json(body): Json<AddCharactersBody>,
) -> AppResult<Json<Value>> {
    if body.ids.is_empty() {
        return Err(AppError::bad_request("no character ids given"));
    }
    state.api.add_orchestrator_characters(&body.ids).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct IdQuery {
    pub id: String,
}

pub async fn delete_character(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<Value>> {
    state.api.delete_orchestrator_character(&query.id).await?;
    Ok(Json(json!({ "ok": true })))
}

// ── Chats & Categories ───────────────────────────────────────────

pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<NormalizedChat>> {
    let chat = state.api.get_chat(&id).await?;
    Ok(Json(aggregate::normalize_chat(&chat)))
}

pub async fn chat_characters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<OrchestratorCharacter>>> {
    let characters = state.api.chat_characters(&id).await?;
    Ok(Json(characters))
}

pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.api.categories().await?;
    Ok(Json(categories))
}

pub async fn chats_with_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ChatsWithCategories>> {
    let result = state.api.chats_with_categories().await?;
    Ok(Json(result))
}

// ── Missions ─────────────────────────────────────────────────────

pub async fn missions(State(state): State<AppState>) -> AppResult<Json<Vec<Mission>>> {
    let missions = state.api.missions().await?;
    Ok(Json(missions))
}

pub async fn mission(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<Mission>> {
    let mission = state.api.mission(&query.id).await?;
    Ok(Json(mission))
}

pub async fn delete_mission(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<Value>> {
    state.api.delete_mission(&query.id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn create_mission(
    State(state): State<AppState>,
    Json(mission): Json<NewMission>,
) -> AppResult<Json<Mission>> {
    let created = state.api.create_mission(&mission).await?;
    Ok(Json(created))
}

#[derive(Deserialize)]
pub struct DescriptionBody {
    pub id: String,
    pub description: String,
}

pub async fn set_mission_description(
    State(state): State<AppState>,
    Json(body): Json<DescriptionBody>,
) -> AppResult<Json<Value>> {
    state
        .api
        .set_mission_description(&body.id, &body.description)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct MissionIdBody {
    pub id: String,
}

pub async fn plan_mission(
    State(state): State<AppState>,
    Json(body): Json<MissionIdBody>,
) -> AppResult<Json<Vec<Scenario>>> {
    let scenarios = state.api.plan_mission(&body.id).await?;
    Ok(Json(scenarios))
}

pub async fn run_mission(
    State(state): State<AppState>,
    Json(body): Json<MissionIdBody>,
) -> AppResult<Json<Value>> {
    state.api.run_mission(&body.id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Multipart upload of resolve-phone results: a CSV file plus optional
/// `mission_id`, numeric `batch_size`, and JSON-encoded `params`
/// fields, forwarded to the orchestrator as-is.
pub async fn upload_resolve_phone_results(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut file_name = "results.csv".to_string();
    let mut csv_bytes: Option<Vec<u8>> = None;
    let mut mission_id: Option<String> = None;
    let mut batch_size: Option<u32> = None;
    let mut extra: Option<Value> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if let Some(n) = field.file_name() {
                    file_name = n.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("unreadable file field: {}", e)))?;
                csv_bytes = Some(bytes.to_vec());
            }
            "mission_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("unreadable mission_id: {}", e)))?;
                if !text.is_empty() {
                    mission_id = Some(text);
                }
            }
            "batch_size" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("unreadable batch_size: {}", e)))?;
                batch_size = Some(text.parse().map_err(|_| {
                    AppError::bad_request(format!("batch_size is not a number: '{}'", text))
                })?);
            }
            "params" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("unreadable params: {}", e)))?;
                extra = Some(serde_json::from_str(&text).map_err(|e| {
                    AppError::bad_request(format!("params is not valid JSON: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let csv_bytes =
        csv_bytes.ok_or_else(|| AppError::bad_request("missing 'file' multipart field"))?;

    state
        .api
        .upload_resolve_phone_results(ResolvePhoneUpload {
            file_name,
            csv_bytes,
            mission_id,
            batch_size,
            extra,
        })
        .await?;
    Ok(Json(json!({ "ok": true })))
}

// ── Statistics ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StatisticsQuery {
    pub id: Option<String>,
}

pub async fn mission_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<Value>> {
    let mut stats = state.api.mission_statistics(query.id.as_deref()).await?;
    aggregate::normalize_datetimes(&mut stats);
    Ok(Json(stats))
}

pub async fn missions_with_statistics(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let mut stats = state.api.missions_with_statistics().await?;
    aggregate::normalize_datetimes(&mut stats);
    Ok(Json(stats))
}

pub async fn missions_with_exposure_and_stats(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let mut stats = state.api.missions_with_exposure_and_stats().await?;
    aggregate::normalize_datetimes(&mut stats);
    Ok(Json(stats))
}
