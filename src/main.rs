use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod config;
mod engine;
mod error;
mod events;
mod model;
mod store;

use cli::Command;
use config::Config;
use model::plan::PackageCode;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    Config::load(path)
}

fn db_path(data_dir: &std::path::Path) -> std::path::PathBuf {
    data_dir.join("comp-engine.db")
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(api::serve(&host, port, db, config))
        }

        Command::PlaceUser {
            user_id,
            display_code,
            sponsor_id,
            placement_id,
            preferred_side,
            data_dir,
        } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let (parent_id, side) = store::tx::run_in_tx(&mut conn, |tx| {
                engine::registration::register_and_place(
                    tx,
                    &user_id,
                    &display_code,
                    sponsor_id.as_deref(),
                    placement_id.as_deref(),
                    preferred_side.map(Into::into),
                    now,
                )
            })?;
            println!("placed {user_id} under {parent_id} on side {side:?}");
            Ok(())
        }

        Command::Activate {
            user_id,
            package_code,
            epin_code,
            payment_ref,
            data_dir,
        } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let mut bus = events::EventBus::new();
            bus.register(Box::new(engine::rank::RankHandler));
            bus.register(Box::new(engine::distributor::Distributor::new(config.clone())));
            let package_code: PackageCode = package_code.into();
            let result = store::tx::run_in_tx(&mut conn, |tx| {
                let req = engine::activation::ActivationRequest {
                    user_id: &user_id,
                    package_code,
                    epin_code: epin_code.as_deref(),
                    payment_ref: payment_ref.as_deref(),
                };
                engine::activation::activate(tx, &bus, &config, &req, now)
            })?;
            println!(
                "activated {user_id} on {package_code:?}: pv_entry={} bv_ledger={:?} materialized_pending={}",
                result.pv_entry_id, result.bv_ledger_id, result.materialized_pending
            );
            Ok(())
        }

        Command::GenerateEpins { qty, package_code, created_by, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let codes = store::tx::run_in_tx(&mut conn, |tx| {
                engine::epin::generate(tx, qty, package_code.into(), &created_by, now)
            })?;
            for code in codes {
                println!("{code}");
            }
            Ok(())
        }

        Command::TriggerSession { index, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut bus = events::EventBus::new();
            bus.register(Box::new(engine::rank::RankHandler));
            bus.register(Box::new(engine::distributor::Distributor::new(config.clone())));
            let rt = tokio::runtime::Runtime::new()?;
            let result = rt.block_on(engine::scheduler::trigger_session_now(
                &db,
                &bus,
                &config,
                index,
                chrono::Utc::now(),
            ))?;
            println!(
                "session {} ({}): new_pairs={} already_processed={}",
                result.session_index, result.date_key, result.new_pairs, result.already_processed
            );
            Ok(())
        }

        Command::DistributeMonthlyFunds { month, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let (car, house) = store::tx::run_in_tx(&mut conn, |tx| {
                let car = engine::fund::distribute_monthly_car_fund(tx, now)?;
                let house = engine::fund::distribute_monthly_house_fund(tx, now)?;
                Ok((car, house))
            })?;
            println!("monthly funds for {month}: car={car} house={house}");
            Ok(())
        }

        Command::AllocateTravelFund { year, total, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let allocation = store::tx::run_in_tx(&mut conn, |tx| {
                engine::fund::allocate_travel_fund(tx, &config, year, total, now)
            })?;
            println!(
                "travel fund {year}: national={} international={}",
                allocation.national_amount, allocation.international_amount
            );
            Ok(())
        }

        Command::RecalculateUserRanks { user_id, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let report = store::tx::run_in_tx(&mut conn, |tx| engine::admin::recalculate_user_ranks(tx, &user_id))?;
            for r in report {
                println!(
                    "{}: rank={} income_pairs={} cutoff_pairs={} changed={}",
                    r.package_code.as_str(), r.rank_index, r.income_pairs, r.cutoff_pairs, r.changed
                );
            }
            Ok(())
        }

        Command::AdminCredit { user_id, amount, note, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let tx_id = store::tx::run_in_tx(&mut conn, |tx| engine::admin::admin_credit(tx, &user_id, amount, &note, now))?;
            println!("credited {user_id} {amount}: tx_id={tx_id}");
            Ok(())
        }

        Command::AdminApproveWithdraw { tx_id, data_dir } => {
            let db = store::open(&db_path(&data_dir))?;
            let mut conn = db.blocking_lock();
            let now = chrono::Utc::now().timestamp();
            let finalize_tx_id = store::tx::run_in_tx(&mut conn, |tx| engine::admin::admin_approve_withdraw(tx, &tx_id, now))?;
            println!("approved withdraw {tx_id}: finalize_tx_id={finalize_tx_id}");
            Ok(())
        }
    }
}
