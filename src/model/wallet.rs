use serde::{Deserialize, Serialize};

/// Ledger row direction (§3 Wallet ledger entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerDirection {
    Credit,
    Debit,
    Hold,
    Release,
    Finalize,
}

impl LedgerDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerDirection::Credit => "credit",
            LedgerDirection::Debit => "debit",
            LedgerDirection::Hold => "hold",
            LedgerDirection::Release => "release",
            LedgerDirection::Finalize => "finalize",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "credit" => LedgerDirection::Credit,
            "debit" => LedgerDirection::Debit,
            "hold" => LedgerDirection::Hold,
            "release" => LedgerDirection::Release,
            "finalize" => LedgerDirection::Finalize,
            _ => return None,
        })
    }

    /// Signed-sum contribution of this direction for invariant §8.1
    /// (`balance + pending == sum of signed ledger amounts`). Holds move
    /// balance -> pending without changing the sum, so they contribute 0.
    pub fn signed_sum_sign(&self) -> f64 {
        match self {
            LedgerDirection::Credit => 1.0,
            LedgerDirection::Debit => -1.0,
            LedgerDirection::Hold => 0.0,
            LedgerDirection::Release => 0.0,
            LedgerDirection::Finalize => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerCategory {
    Binary,
    Rank,
    Royalty,
    Level,
    FundCar,
    FundHouse,
    FundTravel,
    FranchiseHolder,
    FranchiseReferrer,
    Withdraw,
    Deposit,
    Admin,
    Reversal,
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Binary => "binary",
            LedgerCategory::Rank => "rank",
            LedgerCategory::Royalty => "royalty",
            LedgerCategory::Level => "level",
            LedgerCategory::FundCar => "fund-car",
            LedgerCategory::FundHouse => "fund-house",
            LedgerCategory::FundTravel => "fund-travel",
            LedgerCategory::FranchiseHolder => "franchise-holder",
            LedgerCategory::FranchiseReferrer => "franchise-referrer",
            LedgerCategory::Withdraw => "withdraw",
            LedgerCategory::Deposit => "deposit",
            LedgerCategory::Admin => "admin",
            LedgerCategory::Reversal => "reversal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "binary" => LedgerCategory::Binary,
            "rank" => LedgerCategory::Rank,
            "royalty" => LedgerCategory::Royalty,
            "level" => LedgerCategory::Level,
            "fund-car" => LedgerCategory::FundCar,
            "fund-house" => LedgerCategory::FundHouse,
            "fund-travel" => LedgerCategory::FundTravel,
            "franchise-holder" => LedgerCategory::FranchiseHolder,
            "franchise-referrer" => LedgerCategory::FranchiseReferrer,
            "withdraw" => LedgerCategory::Withdraw,
            "deposit" => LedgerCategory::Deposit,
            "admin" => LedgerCategory::Admin,
            "reversal" => LedgerCategory::Reversal,
            _ => return None,
        })
    }
}

/// One per user (§3 Wallet). Invariant: `balance + pending >= 0` always.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: f64,
    pub pending: f64,
    pub total_credited: f64,
    pub total_debited: f64,
}

/// Append-only (§3 Wallet ledger entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletLedgerEntry {
    pub tx_id: String,
    pub user_id: String,
    pub direction: LedgerDirection,
    pub amount: f64,
    pub category: LedgerCategory,
    pub balance_after: f64,
    pub related_entry_ids: Vec<String>,
    pub note: Option<String>,
    pub created_at: i64,
}
