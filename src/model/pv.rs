use serde::{Deserialize, Serialize};

use super::plan::PackageCode;
use super::user::Side;

/// red -> green is the only transition; green is terminal (§3 PV entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvState {
    Red,
    Green,
}

impl PvState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PvState::Red => "red",
            PvState::Green => "green",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "red" => Some(PvState::Red),
            "green" => Some(PvState::Green),
            _ => None,
        }
    }
}

/// Immutable-until-matched binary node. Once `state == Green`, all match
/// fields are frozen (enforced by the session engine transaction, never
/// mutated elsewhere).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvEntry {
    pub id: String,
    pub owner_user_id: String,
    pub package_code: PackageCode,
    pub side: Side,
    pub pv: f64,
    pub state: PvState,
    pub created_at: i64,
    pub matched_with_entry_id: Option<String>,
    pub session_matched_index: Option<i32>,
    pub matched_at: Option<i64>,
    /// transient reservation lock used by the session engine's per-user
    /// transaction (§4.E step 2c); never observed outside one transaction.
    pub locked: bool,
}
