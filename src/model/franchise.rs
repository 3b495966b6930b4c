use serde::{Deserialize, Serialize};

/// A franchise outlet and its product stock (§4.K).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Franchise {
    pub id: String,
    pub owner_user_id: String,
    pub referrer_user_id: Option<String>,
    pub holder_percent: f64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FranchiseProduct {
    pub id: String,
    pub franchise_id: String,
    pub name: String,
    pub stock: i64,
    pub sale_price: f64,
    pub bv_equivalent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub franchise_id: String,
    pub product_id: String,
    pub buyer_user_id: String,
    pub sale_price: f64,
    pub bv_equivalent: f64,
    pub holder_commission: f64,
    pub referrer_income: f64,
    pub created_at: i64,
}
