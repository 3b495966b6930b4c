//! §6 admin surface: operator-triggered credits, withdrawal approval, and
//! rank recalculation. These are the only engine entry points that bypass
//! the usual event-driven paths, so each one is a thin, explicit wrapper
//! rather than a handler on the bus.

use rusqlite::{OptionalExtension, Transaction, params};

use crate::engine::ledger;
use crate::error::{EngineError, EngineResult};
use crate::model::plan::{self, PackageCode};
use crate::model::wallet::LedgerCategory;

/// `admin-credit`: a manual ledger credit, e.g. a goodwill adjustment or a
/// correction the session/rank engines can't express on their own.
pub fn admin_credit(tx: &Transaction, user_id: &str, amount: f64, note: &str, now: i64) -> EngineResult<String> {
    ledger::credit(tx, user_id, amount, LedgerCategory::Admin, &[], Some(note), now)
}

/// `admin-approve-withdraw`: finalizes a previously held withdrawal, moving
/// the on-hold amount out of `pending` for good. `tx_id` is the id returned
/// by the original `ledger::hold` call.
pub fn admin_approve_withdraw(tx: &Transaction, hold_tx_id: &str, now: i64) -> EngineResult<String> {
    let row: Option<(String, f64, String)> = tx
        .query_row(
            "SELECT user_id, amount, direction FROM wallet_ledger WHERE tx_id = ?1",
            params![hold_tx_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;

    let Some((user_id, amount, direction)) = row else {
        return Err(EngineError::NotFound(format!("withdraw hold {hold_tx_id}")));
    };
    if direction != "hold" {
        return Err(EngineError::Validation(format!(
            "wallet_ledger row {hold_tx_id} is not a hold"
        )));
    }

    ledger::finalize(tx, &user_id, amount, now)
}

/// One package's recalculated rank state, for the caller's report.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalculatedPackageRank {
    pub package_code: PackageCode,
    pub rank_index: i32,
    pub income_pairs: u32,
    pub cutoff_pairs: u32,
    pub changed: bool,
}

/// `recalculate-user-ranks`: rebuilds a user's rank counters for every
/// package from the authoritative `processed_pairs` history rather than
/// trusting the incrementally-maintained `users` row, and corrects any
/// drift found. Unlike `ledger::reconcile` (which only detects and reports
/// a mismatch as Fatal), this one repairs the counters in place — rank
/// state is derived data, not an append-only ledger, so there's nothing to
/// preserve by refusing to touch it.
pub fn recalculate_user_ranks(tx: &Transaction, user_id: &str) -> EngineResult<Vec<RecalculatedPackageRank>> {
    let mut report = Vec::with_capacity(3);
    for pkg in PackageCode::ALL_IN_PROCESSING_ORDER {
        report.push(recalculate_one_package(tx, user_id, pkg)?);
    }
    Ok(report)
}

fn recalculate_one_package(
    tx: &Transaction,
    user_id: &str,
    pkg: PackageCode,
) -> EngineResult<RecalculatedPackageRank> {
    let (rank_col, income_col, cutoff_col) = match pkg {
        PackageCode::Silver => ("rank_index_silver", "income_pairs_silver", "cutoff_pairs_silver"),
        PackageCode::Gold => ("rank_index_gold", "income_pairs_gold", "cutoff_pairs_gold"),
        PackageCode::Ruby => ("rank_index_ruby", "income_pairs_ruby", "cutoff_pairs_ruby"),
    };

    let total_pairs: u32 = tx.query_row(
        "SELECT COUNT(*) FROM processed_pairs WHERE user_id = ?1 AND package_code = ?2",
        params![user_id, pkg.as_str()],
        |r| r.get(0),
    )?;

    let completed_steps = total_pairs / plan::PAIRS_PER_RANK_STEP;
    let remainder = total_pairs % plan::PAIRS_PER_RANK_STEP;
    // Every package starts at rank -1 ("unranked") and only steps to rank 0
    // once the first 8 pairs complete, matching `rank::on_pair_paid`'s
    // incremental stepping — not rank 0 at zero pairs.
    let rank_index = (completed_steps as i32 - 1).min(plan::MAX_RANK_INDEX);
    let (income_pairs, cutoff_pairs) = if remainder <= plan::INCOME_PAIR_CAP {
        (remainder, 0)
    } else {
        (plan::INCOME_PAIR_CAP, remainder - plan::INCOME_PAIR_CAP)
    };

    let (current_rank, current_income, current_cutoff): (i32, u32, u32) = tx.query_row(
        &format!("SELECT {rank_col}, {income_col}, {cutoff_col} FROM users WHERE id = ?1"),
        params![user_id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;

    let changed = current_rank != rank_index || current_income != income_pairs || current_cutoff != cutoff_pairs;
    if changed {
        tracing::warn!(
            user_id, package = pkg.as_str(), current_rank, rank_index,
            "recalculate-user-ranks found drift, correcting"
        );
        tx.execute(
            &format!("UPDATE users SET {rank_col} = ?1, {income_col} = ?2, {cutoff_col} = ?3 WHERE id = ?4"),
            params![rank_index, income_pairs, cutoff_pairs, user_id],
        )?;
    }

    Ok(RecalculatedPackageRank {
        package_code: pkg,
        rank_index,
        income_pairs,
        cutoff_pairs,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    #[test]
    fn admin_credit_appends_ledger_row() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, created_at) VALUES ('u1','U1',0)",
                params![],
            )
            .unwrap();
            admin_credit(tx, "u1", 25.0, "goodwill adjustment", 1)?;
            assert_eq!(ledger::get_balance(tx, "u1")?.balance, 25.0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn admin_approve_withdraw_finalizes_a_hold() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, created_at) VALUES ('u1','U1',0)",
                params![],
            )
            .unwrap();
            ledger::credit(tx, "u1", 100.0, LedgerCategory::Admin, &[], None, 1)?;
            let hold_id = ledger::hold(tx, "u1", 40.0, &[], 2)?;
            admin_approve_withdraw(tx, &hold_id, 3)?;
            let w = ledger::get_balance(tx, "u1")?;
            assert_eq!(w.balance, 60.0);
            assert_eq!(w.pending, 0.0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn recalculate_corrects_drifted_counters() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, income_pairs_silver, created_at) VALUES ('u1','U1', 3, 0)",
                params![],
            )
            .unwrap();
            tx.execute(
                "INSERT INTO session_runs (id, date_key, session_index, started_at, finalized) VALUES ('sr1','2026-01-01',1,0,1)",
                params![],
            )?;
            for i in 0..9 {
                tx.execute(
                    "INSERT INTO processed_pairs (id, session_run_id, user_id, package_code, left_entry_id, right_entry_id, amount, credited_at)
                     VALUES (?1, 'sr1', 'u1', 'silver', 'l', 'r', 10.0, ?2)",
                    params![format!("pp{i}"), i],
                )?;
            }
            let report = recalculate_user_ranks(tx, "u1")?;
            let silver = report.iter().find(|r| r.package_code == PackageCode::Silver).unwrap();
            assert_eq!(silver.rank_index, 0);
            assert_eq!(silver.income_pairs, 1);
            assert_eq!(silver.cutoff_pairs, 0);
            assert!(silver.changed);
            Ok(())
        })
        .unwrap();
    }
}
