use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::admin;
use crate::store::tx::run_in_tx;

#[derive(Deserialize)]
pub struct CreditBody {
    pub user_id: String,
    pub amount: f64,
    pub note: String,
}

#[derive(Serialize)]
pub struct TxIdResponse {
    pub tx_id: String,
}

/// `POST /api/admin/credit` (CLI: `admin-credit <user-id> <amount> <note>`).
pub async fn credit(
    State(state): State<AppState>,
    Json(body): Json<CreditBody>,
) -> Result<Json<TxIdResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let tx_id = run_in_tx(&mut conn, |tx| admin::admin_credit(tx, &body.user_id, body.amount, &body.note, now))?;

    Ok(Json(TxIdResponse { tx_id }))
}

/// `POST /api/admin/approve-withdraw/{hold_tx_id}` (CLI:
/// `admin-approve-withdraw <tx-id>`).
pub async fn approve_withdraw(
    State(state): State<AppState>,
    Path(hold_tx_id): Path<String>,
) -> Result<Json<TxIdResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let tx_id = run_in_tx(&mut conn, |tx| admin::admin_approve_withdraw(tx, &hold_tx_id, now))?;

    Ok(Json(TxIdResponse { tx_id }))
}

#[derive(Serialize)]
pub struct RecalculatedRank {
    pub package_code: String,
    pub rank_index: i32,
    pub income_pairs: u32,
    pub cutoff_pairs: u32,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct RecalculateResponse {
    pub user_id: String,
    pub ranks: Vec<RecalculatedRank>,
}

/// `POST /api/admin/recalculate-ranks/{user_id}` (CLI:
/// `recalculate-user-ranks <user-id>`).
pub async fn recalculate_ranks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RecalculateResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;

    let report = run_in_tx(&mut conn, |tx| admin::recalculate_user_ranks(tx, &user_id))?;

    Ok(Json(RecalculateResponse {
        user_id,
        ranks: report
            .into_iter()
            .map(|r| RecalculatedRank {
                package_code: r.package_code.as_str().to_string(),
                rank_index: r.rank_index,
                income_pairs: r.income_pairs,
                cutoff_pairs: r.cutoff_pairs,
                changed: r.changed,
            })
            .collect(),
    }))
}
