use serde::{Deserialize, Serialize};

use super::plan::PackageCode;

/// §3 EPIN. `is_used = true` is terminal; unlimited transfers, no expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epin {
    pub code: String,
    pub package_code: PackageCode,
    pub owner_user_id: Option<String>,
    pub is_used: bool,
    pub used_by_user_id: Option<String>,
    pub used_at: Option<i64>,
    pub transfer_count: u32,
    pub created_by: String,
    pub created_at: i64,
}
