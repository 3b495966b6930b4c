use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::activation::{self, ActivationRequest};
use crate::model::plan::PackageCode;
use crate::store::tx::run_in_tx;

#[derive(Deserialize)]
pub struct ActivateBody {
    pub user_id: String,
    pub package_code: PackageCode,
    pub epin_code: Option<String>,
    pub payment_ref: Option<String>,
}

#[derive(Serialize)]
pub struct ActivateResponse {
    pub pv_entry_id: String,
    pub bv_ledger_id: Option<String>,
    pub materialized_pending: f64,
}

/// `POST /api/activate` — §4.D entry point external activation flows call.
pub async fn activate(
    State(state): State<AppState>,
    Json(body): Json<ActivateBody>,
) -> Result<Json<ActivateResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let result = run_in_tx(&mut conn, |tx| {
        let req = ActivationRequest {
            user_id: &body.user_id,
            package_code: body.package_code,
            epin_code: body.epin_code.as_deref(),
            payment_ref: body.payment_ref.as_deref(),
        };
        activation::activate(tx, &inner.bus, &inner.config, &req, now)
    })?;

    Ok(Json(ActivateResponse {
        pv_entry_id: result.pv_entry_id,
        bv_ledger_id: result.bv_ledger_id,
        materialized_pending: result.materialized_pending,
    }))
}
