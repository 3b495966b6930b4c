pub mod bv;
pub mod epin;
pub mod franchise;
pub mod fund;
pub mod plan;
pub mod pv;
pub mod rank;
pub mod session;
pub mod user;
pub mod wallet;

pub use bv::BvLedgerEntry;
pub use epin::Epin;
pub use franchise::{Franchise, FranchiseProduct, Sale};
pub use fund::{FundHistoryEntry, FundPool, TravelAllocation};
pub use plan::{PackageCode, PackagePlan};
pub use pv::{PvEntry, PvState};
pub use rank::RankHistoryEntry;
pub use session::{ProcessedPair, SessionRun};
pub use user::{Side, User};
pub use wallet::{LedgerCategory, LedgerDirection, Wallet, WalletLedgerEntry};
