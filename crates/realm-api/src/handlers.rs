//! REST API endpoint handlers.
//!
//! Every mutation goes through the engine services in [`AppState`]:
//! actions through the validator, resets and onboarding through the
//! lifecycle. Reads tick the province first so the snapshot returned
//! always includes turns accrued since the last scheduler pass.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/catalog` | The active catalog |
//! | `POST` | `/api/provinces` | Onboard a new province |
//! | `GET` | `/api/provinces/{id}` | Accrue, then return the snapshot |
//! | `POST` | `/api/provinces/{id}/actions` | Execute one action |
//! | `POST` | `/api/provinces/{id}/reset` | Reset to defaults |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use realm_core::{ProvinceStore, TickOutcome};
use realm_types::{ActionParameters, ActionRequest, ProvinceId, Traits, UserId};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /api/provinces`.
#[derive(Debug, serde::Deserialize)]
pub struct CreateProvince {
    /// The owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Faction, class, and alignment.
    pub traits: Traits,
}

/// Parse a UUID path segment into a province id.
pub(crate) fn parse_province_id(raw: &str) -> Result<ProvinceId, ApiError> {
    Uuid::parse_str(raw)
        .map(ProvinceId::from)
        .map_err(|e| ApiError::InvalidUuid(format!("{raw}: {e}")))
}

/// Liveness probe.
#[allow(clippy::unused_async)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// The catalog formulas are currently evaluated against.
#[allow(clippy::unused_async)]
pub async fn get_catalog<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    Json(state.economy.catalog.clone())
}

/// Onboard a new province with default resources.
pub async fn create_province<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateProvince>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::Unprocessable(String::from(
            "province name must not be empty",
        )));
    }
    let snapshot = state
        .lifecycle
        .create_province(body.owner_id, body.name, body.traits, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Accrue any elapsed turns, then return the province snapshot.
pub async fn get_province<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let province_id = parse_province_id(&id_str)?;
    let snapshot = match state.clock.tick_province(province_id, Utc::now()).await? {
        TickOutcome::Committed {
            snapshot,
            turns_credited,
            ..
        } => {
            debug!(%province_id, turns_credited, "Accrued on read");
            *snapshot
        }
        TickOutcome::NotDue | TickOutcome::Skipped => state.store.get(province_id).await?,
    };
    Ok(Json(snapshot))
}

/// Execute one action against a province.
///
/// A rejection by the formulas is still `200 OK` with `success: false`.
pub async fn execute_action<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
    Json(action): Json<ActionParameters>,
) -> Result<impl IntoResponse, ApiError> {
    let province_id = parse_province_id(&id_str)?;
    let request = ActionRequest {
        province_id,
        action,
    };
    let response = state.validator.execute(&request, Utc::now()).await?;
    Ok(Json(response))
}

/// Reset a province to its defaults, keeping its identity.
pub async fn reset_province<S: ProvinceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let province_id = parse_province_id(&id_str)?;
    let snapshot = state
        .lifecycle
        .reset_province(province_id, Utc::now())
        .await?;
    Ok(Json(snapshot))
}
