use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::registration;
use crate::model::user::Side;
use crate::store::tx::run_in_tx;

#[derive(Deserialize)]
pub struct PlaceUserBody {
    pub user_id: String,
    pub display_code: String,
    pub sponsor_id: Option<String>,
    pub placement_id: Option<String>,
    pub preferred_side: Option<Side>,
}

#[derive(Serialize)]
pub struct PlaceUserResponse {
    pub parent_id: String,
    pub side: Side,
}

/// `POST /api/place-user` — §4.C entry point external signup flows call.
pub async fn place_user(
    State(state): State<AppState>,
    Json(body): Json<PlaceUserBody>,
) -> Result<Json<PlaceUserResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let (parent_id, side) = run_in_tx(&mut conn, |tx| {
        registration::register_and_place(
            tx,
            &body.user_id,
            &body.display_code,
            body.sponsor_id.as_deref(),
            body.placement_id.as_deref(),
            body.preferred_side,
            now,
        )
    })?;

    Ok(Json(PlaceUserResponse { parent_id, side }))
}

#[derive(Serialize)]
pub struct WalletBalanceResponse {
    pub user_id: String,
    pub balance: f64,
    pub pending: f64,
    pub total_credited: f64,
    pub total_debited: f64,
}

/// `GET /api/users/{id}/wallet` — read-only balance lookup, useful for
/// confirming an admin op actually landed.
pub async fn wallet_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<WalletBalanceResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;

    let wallet = run_in_tx(&mut conn, |tx| crate::engine::ledger::get_balance(tx, &user_id))?;

    Ok(Json(WalletBalanceResponse {
        user_id,
        balance: wallet.balance,
        pending: wallet.pending,
        total_credited: wallet.total_credited,
        total_debited: wallet.total_debited,
    }))
}
