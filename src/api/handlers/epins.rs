use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::epin;
use crate::model::plan::PackageCode;
use crate::store::tx::run_in_tx;

#[derive(Deserialize)]
pub struct GenerateBody {
    pub qty: u32,
    pub package_code: PackageCode,
    pub created_by: String,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub codes: Vec<String>,
}

/// `POST /api/epins/generate` (CLI: `generate-epins`).
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let codes = run_in_tx(&mut conn, |tx| {
        epin::generate(tx, body.qty, body.package_code, &body.created_by, now)
    })?;

    Ok(Json(GenerateResponse { codes }))
}

#[derive(Deserialize)]
pub struct TransferBody {
    pub to_user_id: String,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /api/epins/{code}/transfer`.
pub async fn transfer(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<TransferBody>,
) -> Result<Json<OkResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    run_in_tx(&mut conn, |tx| epin::transfer(tx, &code, &body.to_user_id, now))?;

    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
pub struct ReserveBody {
    pub user_id: String,
}

/// `POST /api/epins/{code}/reserve`.
pub async fn reserve(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<ReserveBody>,
) -> Result<Json<OkResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;

    run_in_tx(&mut conn, |tx| epin::reserve(tx, &code, &body.user_id))?;

    Ok(Json(OkResponse { ok: true }))
}
