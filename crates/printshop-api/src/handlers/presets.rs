//! Preset administration endpoints.
//!
//! Every config write goes through the validator inside the repository. A
//! successful write schedules a from-price refresh for the products that use
//! the preset; scheduling is best-effort and never fails the save.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use printshop_core::pricing::validate;
use printshop_core::{CreatePresetRequest, PricingPreset, UpdatePresetRequest};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPresetsQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// `GET /admin/presets`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListPresetsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let presets = state.presets.list(query.active_only).await?;
    Ok(Json(presets))
}

/// `GET /admin/presets/:key`
pub async fn get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let preset = state
        .presets
        .get_by_key(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Preset '{}' not found", key)))?;
    Ok(Json(preset))
}

/// `POST /admin/presets`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreatePresetRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let preset = state.presets.upsert(req).await?;
    schedule_refresh(&state, &preset);
    Ok((StatusCode::CREATED, Json(preset)))
}

/// `PATCH /admin/presets/:key`
pub async fn update(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<UpdatePresetRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let preset = state.presets.update(&key, req).await?;
    schedule_refresh(&state, &preset);
    Ok(Json(preset))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub model: String,
    #[serde(default)]
    pub config: JsonValue,
}

/// `POST /admin/presets/validate`
///
/// Dry run: always 200, the report says whether the config would be accepted.
pub async fn validate_config(
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    Ok(Json(validate(&req.model, &req.config)))
}

fn schedule_refresh(state: &AppState, preset: &PricingPreset) {
    let Some(refresher) = &state.refresher else {
        debug!(
            subsystem = "api",
            component = "presets",
            preset_key = %preset.key,
            "Refresher disabled, skipping from-price refresh"
        );
        return;
    };

    match refresher.enqueue_preset(preset.id) {
        Ok(()) => info!(
            subsystem = "api",
            component = "presets",
            op = "schedule_refresh",
            preset_key = %preset.key,
            "From-price refresh scheduled"
        ),
        Err(e) => warn!(
            subsystem = "api",
            component = "presets",
            op = "schedule_refresh",
            preset_key = %preset.key,
            error = %e,
            "Failed to schedule from-price refresh"
        ),
    }
}
