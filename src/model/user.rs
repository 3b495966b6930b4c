use serde::{Deserialize, Serialize};

use super::plan::PackageCode;

/// Which leg of the placement tree a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    L,
    R,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::L => Side::R,
            Side::R => Side::L,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::L => "L",
            Side::R => "R",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "L" => Some(Side::L),
            "R" => Some(Side::R),
            _ => None,
        }
    }
}

/// Identity + position (§3 User). Genealogy children pointers are mutated only
/// by the placement allocator (`engine::placement`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_code: String,
    pub sponsor_id: Option<String>,
    pub placement_parent_id: Option<String>,
    pub placement_side: Option<Side>,
    pub left_child_id: Option<String>,
    pub right_child_id: Option<String>,
    pub active_package: Option<PackageCode>,
    pub package_activated_at: Option<i64>,
    /// per-package rank index, -1 means unranked. Index 0=silver,1=gold,2=ruby.
    pub rank_index: [i32; 3],
    pub income_pairs: [u32; 3],
    pub cutoff_pairs: [u32; 3],
    pub total_royalty_received: f64,
    pub created_at: i64,
}

impl User {
    pub fn new(id: String, display_code: String, sponsor_id: Option<String>, created_at: i64) -> Self {
        User {
            id,
            display_code,
            sponsor_id,
            placement_parent_id: None,
            placement_side: None,
            left_child_id: None,
            right_child_id: None,
            active_package: None,
            package_activated_at: None,
            rank_index: [-1, -1, -1],
            income_pairs: [0, 0, 0],
            cutoff_pairs: [0, 0, 0],
            total_royalty_received: 0.0,
            created_at,
        }
    }

    pub fn rank_index_for(&self, pkg: PackageCode) -> i32 {
        self.rank_index[pkg as usize]
    }

    pub fn has_active_package(&self, pkg: PackageCode) -> bool {
        self.active_package == Some(pkg)
    }
}
