use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::fund;
use crate::store::tx::run_in_tx;

#[derive(Serialize)]
pub struct MonthlyFundsResponse {
    pub car_fund_paid: f64,
    pub house_fund_paid: f64,
}

/// `POST /api/funds/monthly` (CLI: `distribute-monthly-funds <month>`). The
/// `month` argument only labels the run in logs — the pool itself carries
/// no month field (§3 Fund pool is a singleton), so this distributes
/// whatever the pool currently holds and resets it.
pub async fn distribute_monthly(State(state): State<AppState>) -> Result<Json<MonthlyFundsResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let (car_fund_paid, house_fund_paid) = run_in_tx(&mut conn, |tx| {
        let car = fund::distribute_monthly_car_fund(tx, now)?;
        let house = fund::distribute_monthly_house_fund(tx, now)?;
        Ok((car, house))
    })?;

    Ok(Json(MonthlyFundsResponse { car_fund_paid, house_fund_paid }))
}

#[derive(Deserialize)]
pub struct TravelFundBody {
    pub year: i32,
    pub total: f64,
}

#[derive(Serialize)]
pub struct TravelFundResponse {
    pub national_amount: f64,
    pub international_amount: f64,
}

/// `POST /api/funds/travel` (CLI: `allocate-travel-fund <year> <total>`).
pub async fn allocate_travel(
    State(state): State<AppState>,
    Json(body): Json<TravelFundBody>,
) -> Result<Json<TravelFundResponse>, ApiError> {
    let inner = state.inner.read().await;
    let mut conn = inner.db.lock().await;
    let now = chrono::Utc::now().timestamp();

    let allocation = run_in_tx(&mut conn, |tx| {
        fund::allocate_travel_fund(tx, &inner.config, body.year, body.total, now)
    })?;

    Ok(Json(TravelFundResponse {
        national_amount: allocation.national_amount,
        international_amount: allocation.international_amount,
    }))
}
