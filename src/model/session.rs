use serde::{Deserialize, Serialize};

use super::plan::PackageCode;

/// One execution of the binary session engine. `(date_key, session_index)`
/// is the idempotency key (§3 Session run, §4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRun {
    pub id: String,
    pub date_key: String,
    pub session_index: i32,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub finalized: bool,
}

/// §3 Processed pair record, nested under a SessionRun.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPair {
    pub session_run_id: String,
    pub user_id: String,
    pub package_code: PackageCode,
    pub left_entry_id: String,
    pub right_entry_id: String,
    pub amount: f64,
    pub credited_at: i64,
}

/// Fixed daily windows (§6), minutes since local midnight.
pub const SESSION_WINDOWS_MINUTES: [(i32, u32, u32); 8] = [
    (1, 6 * 60, 8 * 60 + 15),
    (2, 8 * 60 + 15, 10 * 60 + 30),
    (3, 10 * 60 + 30, 12 * 60 + 45),
    (4, 12 * 60 + 45, 15 * 60),
    (5, 15 * 60, 17 * 60 + 15),
    (6, 17 * 60 + 15, 19 * 60 + 30),
    (7, 19 * 60 + 30, 21 * 60 + 45),
    (8, 21 * 60 + 45, 24 * 60),
];
