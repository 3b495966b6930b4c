use serde::{Deserialize, Serialize};

/// The three packages a user can hold. Plan tables (§6) are keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageCode {
    Silver,
    Gold,
    Ruby,
}

impl PackageCode {
    pub const ALL_IN_PROCESSING_ORDER: [PackageCode; 3] =
        [PackageCode::Silver, PackageCode::Gold, PackageCode::Ruby];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageCode::Silver => "silver",
            PackageCode::Gold => "gold",
            PackageCode::Ruby => "ruby",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "silver" => Some(PackageCode::Silver),
            "gold" => Some(PackageCode::Gold),
            "ruby" => Some(PackageCode::Ruby),
            _ => None,
        }
    }

    pub fn plan(&self) -> PackagePlan {
        match self {
            PackageCode::Silver => PackagePlan {
                code: *self,
                pv: 35.0,
                bv: 35.0,
                pair_income: 10.0,
                cap_per_session: 1,
            },
            PackageCode::Gold => PackagePlan {
                code: *self,
                pv: 155.0,
                bv: 155.0,
                pair_income: 50.0,
                cap_per_session: 1,
            },
            PackageCode::Ruby => PackagePlan {
                code: *self,
                pv: 1250.0,
                bv: 1250.0,
                pair_income: 500.0,
                cap_per_session: 1,
            },
        }
    }
}

/// Static plan row for a package (§6 package plan table).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackagePlan {
    pub code: PackageCode,
    pub pv: f64,
    pub bv: f64,
    pub pair_income: f64,
    pub cap_per_session: u32,
}

/// Rank names, index 0..=8, "Company Star" is the ceiling rank.
pub const RANK_NAMES: [&str; 9] = [
    "Star",
    "Silver Star",
    "Gold Star",
    "Ruby Star",
    "Emerald Star",
    "Diamond Star",
    "Crown Star",
    "Ambassador Star",
    "Company Star",
];

pub const RANK_STAR: i32 = 0;
pub const RANK_SILVER_STAR: i32 = 1;
pub const RANK_GOLD_STAR: i32 = 2;
pub const RANK_RUBY_STAR: i32 = 3;
pub const RANK_EMERALD_STAR: i32 = 4;
pub const RANK_DIAMOND_STAR: i32 = 5;
pub const RANK_CROWN_STAR: i32 = 6;
pub const RANK_AMBASSADOR_STAR: i32 = 7;
pub const RANK_COMPANY_STAR: i32 = 8;

pub const MAX_RANK_INDEX: i32 = RANK_COMPANY_STAR;

/// Lifetime one-shot rank income table (§6), indexed [rank_index][package].
pub fn rank_income(rank_index: i32, package: PackageCode) -> f64 {
    let row: [f64; 3] = match rank_index {
        0 => [10.0, 50.0, 500.0],
        1 => [20.0, 100.0, 1000.0],
        2 => [40.0, 200.0, 2000.0],
        3 => [80.0, 400.0, 4000.0],
        4 => [160.0, 800.0, 8000.0],
        5 => [320.0, 1600.0, 16000.0],
        6 => [640.0, 3200.0, 32000.0],
        7 => [1280.0, 6400.0, 64000.0],
        8 => [2560.0, 12800.0, 128000.0],
        _ => [0.0, 0.0, 0.0],
    };
    match package {
        PackageCode::Silver => row[0],
        PackageCode::Gold => row[1],
        PackageCode::Ruby => row[2],
    }
}

/// Royalty percentage table (§6), by silver rank index. Returned as a fraction (1% = 0.01).
pub fn royalty_rank_rate(rank_index: i32) -> f64 {
    match rank_index {
        0 => 0.03,
        1 => 0.01,
        2 => 0.02,
        3 => 0.03,
        4 => 0.04,
        5 => 0.05,
        6 => 0.06,
        7 => 0.07,
        8 => 0.08,
        _ => 0.0,
    }
}

/// Pairs required per rank step: 4 income + 4 cutoff (§6).
pub const PAIRS_PER_RANK_STEP: u32 = 8;
pub const INCOME_PAIR_CAP: u32 = 4;

pub const LEVEL_COUNT: usize = 10;
pub const LEVEL_INCOME_RATE: f64 = 0.005;

pub const LEVEL_STAR_L1_THRESHOLD: u32 = 10;
pub const LEVEL_STAR_L1_RATE: f64 = 0.010;
pub const LEVEL_STAR_L2_THRESHOLD: u32 = 70;
pub const LEVEL_STAR_L2_RATE: f64 = 0.011;
pub const LEVEL_STAR_L3_THRESHOLD: u32 = 200;
pub const LEVEL_STAR_L3_RATE: f64 = 0.012;

pub const ROYALTY_STAR_CAP_PHASE_CEILING: f64 = 35.0;
pub const ROYALTY_STAR_CAP_RATE: f64 = 0.03;

pub const FRANCHISE_HOLDER_MIN_PERCENT: f64 = 0.05;
pub const FRANCHISE_REFERRER_PERCENT: f64 = 0.01;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_matches_table() {
        assert_eq!(PackageCode::Silver.plan().pair_income, 10.0);
        assert_eq!(PackageCode::Gold.plan().pv, 155.0);
        assert_eq!(PackageCode::Ruby.plan().bv, 1250.0);
    }

    #[test]
    fn rank_income_is_doubling_by_package_row() {
        assert_eq!(rank_income(0, PackageCode::Silver), 10.0);
        assert_eq!(rank_income(8, PackageCode::Ruby), 128000.0);
    }

    #[test]
    fn royalty_rate_table() {
        assert_eq!(royalty_rank_rate(RANK_SILVER_STAR), 0.01);
        assert_eq!(royalty_rank_rate(RANK_COMPANY_STAR), 0.08);
    }
}
