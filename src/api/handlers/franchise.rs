use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::franchise;
use crate::store::tx::run_in_tx;

#[derive(Deserialize)]
pub struct SellBody {
    pub franchise_id: String,
    pub product_id: String,
    pub buyer_user_id: String,
}

#[derive(Serialize)]
pub struct SaleResponse {
    pub id: String,
    pub sale_price: f64,
    pub bv_equivalent: f64,
    pub holder_commission: f64,
    pub referrer_income: f64,
}

/// `POST /api/franchise/sell` (§4.K).
pub async fn sell(
    State(state): State<AppState>,
    Json(body): Json<SellBody>,
) -> Result<Json<SaleResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let sale = run_in_tx(&mut conn, |tx| {
        franchise::sell(
            tx,
            &inner.bus,
            &inner.config,
            &body.franchise_id,
            &body.product_id,
            &body.buyer_user_id,
            now,
        )
    })?;

    Ok(Json(SaleResponse {
        id: sale.id,
        sale_price: sale.sale_price,
        bv_equivalent: sale.bv_equivalent,
        holder_commission: sale.holder_commission,
        referrer_income: sale.referrer_income,
    }))
}
