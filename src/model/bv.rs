use serde::{Deserialize, Serialize};

/// §3 BV ledger entry. `signed_amount` is positive on credit, negative on
/// consumption (royalty/fund distributions consume CTO BV).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BvLedgerEntry {
    pub id: String,
    pub user_id: String,
    pub signed_amount: f64,
    pub source: String,
    pub created_at: i64,
}
