use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::model::plan::PackageCode;
use crate::model::user::Side;

/// Binary MLM compensation engine — session-driven pair matching, rank
/// progression, BV fan-out, fund pools, EPINs, and franchise sales.
#[derive(Parser)]
#[command(name = "binary-comp-engine", version, about)]
pub struct Cli {
    /// Path to a TOML config file overriding the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise the default log verbosity.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the session scheduler loop and the admin HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Place a user in the binary tree (§4.C), the minimal entry point an
    /// external signup flow calls into.
    PlaceUser {
        user_id: String,
        display_code: String,
        #[arg(long)]
        sponsor_id: Option<String>,
        #[arg(long)]
        placement_id: Option<String>,
        #[arg(long)]
        preferred_side: Option<SideArg>,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Activate a package for a user via EPIN or payment reference (§4.D).
    Activate {
        user_id: String,
        package_code: PackageArg,
        #[arg(long)]
        epin_code: Option<String>,
        #[arg(long)]
        payment_ref: Option<String>,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Generate a batch of EPIN codes for a package.
    GenerateEpins {
        qty: u32,
        package_code: PackageArg,
        #[arg(long, default_value = "admin")]
        created_by: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Force a session window to run for today, regardless of wall clock.
    TriggerSession {
        index: i32,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Distribute the current car/house fund pools and reset them.
    DistributeMonthlyFunds {
        /// Informational only — the pool is a singleton, not month-keyed.
        month: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Split a travel fund total by the configured national/international
    /// shares for the given year.
    AllocateTravelFund {
        year: i32,
        total: f64,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Recompute a user's rank counters from `processed_pairs` history and
    /// correct any drift.
    RecalculateUserRanks {
        user_id: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Manual wallet credit, e.g. a goodwill adjustment.
    AdminCredit {
        user_id: String,
        amount: f64,
        note: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Finalize a previously held withdrawal.
    AdminApproveWithdraw {
        tx_id: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum PackageArg {
    Silver,
    Gold,
    Ruby,
}

impl From<PackageArg> for PackageCode {
    fn from(p: PackageArg) -> Self {
        match p {
            PackageArg::Silver => PackageCode::Silver,
            PackageArg::Gold => PackageCode::Gold,
            PackageArg::Ruby => PackageCode::Ruby,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum SideArg {
    L,
    R,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::L => Side::L,
            SideArg::R => Side::R,
        }
    }
}
