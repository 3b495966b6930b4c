use serde::{Deserialize, Serialize};

/// §3 Fund pool, singleton row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundPool {
    pub total_cto_bv: f64,
    pub car_pool_monthly: f64,
    pub house_pool_monthly: f64,
    pub travel_fund: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundHistoryEntry {
    pub id: String,
    pub kind: String,
    pub amount: f64,
    pub note: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelAllocation {
    pub id: String,
    pub year: i32,
    pub national_amount: f64,
    pub international_amount: f64,
    pub created_at: i64,
}
