use serde::{Deserialize, Serialize};

use super::plan::PackageCode;

/// §3 Rank history. At most one row per (user_id, package_code, rank_index)
/// — the uniqueness constraint that enforces single-credit rank income
/// (§8 invariant 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankHistoryEntry {
    pub user_id: String,
    pub package_code: PackageCode,
    pub rank_index: i32,
    pub credited_amount: f64,
    pub created_at: i64,
}
