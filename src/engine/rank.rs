//! §4.F Rank engine: per-(user, package) pair counters drive discrete rank
//! upgrades every 8 pairs (4 income + 4 cutoff), with an idempotent
//! one-shot rank-income credit enforced by a DB uniqueness constraint
//! rather than an application-level check (§9 Design Notes).

use rusqlite::{Transaction, params};

use crate::engine::ledger;
use crate::error::EngineResult;
use crate::events::{Event, Handler};
use crate::model::plan::{self, PackageCode};
use crate::model::wallet::LedgerCategory;

/// Bus-registered counterpart of [`on_pair_paid`] (§4.E step 2c dispatches
/// `PairPaid` rather than calling the rank engine directly, so the session
/// engine never imports this module).
pub struct RankHandler;

impl Handler for RankHandler {
    fn handle(&self, tx: &Transaction, event: &Event) -> EngineResult<()> {
        if let Event::PairPaid(e) = event {
            on_pair_paid(tx, &e.user_id, e.package_code, e.created_at)?;
        }
        Ok(())
    }
}

fn columns(pkg: PackageCode) -> (&'static str, &'static str, &'static str) {
    match pkg {
        PackageCode::Silver => ("rank_index_silver", "income_pairs_silver", "cutoff_pairs_silver"),
        PackageCode::Gold => ("rank_index_gold", "income_pairs_gold", "cutoff_pairs_gold"),
        PackageCode::Ruby => ("rank_index_ruby", "income_pairs_ruby", "cutoff_pairs_ruby"),
    }
}

/// Invoked once per paid pair, in the same transaction as the pair credit
/// (§4.E step 2c).
pub fn on_pair_paid(tx: &Transaction, user_id: &str, pkg: PackageCode, now: i64) -> EngineResult<()> {
    let (rank_col, income_col, cutoff_col) = columns(pkg);

    let (mut rank_index, mut income_pairs, mut cutoff_pairs): (i32, u32, u32) = tx.query_row(
        &format!("SELECT {rank_col}, {income_col}, {cutoff_col} FROM users WHERE id = ?1"),
        params![user_id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;

    if income_pairs < plan::INCOME_PAIR_CAP {
        income_pairs += 1;
    } else {
        cutoff_pairs += 1;
    }

    if income_pairs + cutoff_pairs >= plan::PAIRS_PER_RANK_STEP {
        let new_rank = (rank_index + 1).min(plan::MAX_RANK_INDEX);
        income_pairs = 0;
        cutoff_pairs = 0;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO rank_history (user_id, package_code, rank_index, credited_amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, pkg.as_str(), new_rank, plan::rank_income(new_rank, pkg), now],
        )?;
        if inserted == 1 {
            ledger::credit(
                tx,
                user_id,
                plan::rank_income(new_rank, pkg),
                LedgerCategory::Rank,
                &[],
                Some(&format!("rank step to {}", plan::RANK_NAMES[new_rank as usize])),
                now,
            )?;
        }
        rank_index = new_rank;
    }

    tx.execute(
        &format!("UPDATE users SET {rank_col} = ?1, {income_col} = ?2, {cutoff_col} = ?3 WHERE id = ?4"),
        params![rank_index, income_pairs, cutoff_pairs, user_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    fn insert_user(tx: &Transaction, id: &str) {
        tx.execute(
            "INSERT OR IGNORE INTO users (id, display_code, created_at) VALUES (?1, ?1, 0)",
            params![id],
        )
        .unwrap();
    }

    #[test]
    fn eight_pairs_steps_rank_once_lifetime_one_shot() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user(tx, "p");
            for i in 0..8 {
                on_pair_paid(tx, "p", PackageCode::Silver, i)?;
            }
            let (rank, income, cutoff): (i32, u32, u32) = tx.query_row(
                "SELECT rank_index_silver, income_pairs_silver, cutoff_pairs_silver FROM users WHERE id='p'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;
            assert_eq!(rank, 0);
            assert_eq!(income, 0);
            assert_eq!(cutoff, 0);
            let w = ledger::get_balance(tx, "p")?;
            assert_eq!(w.balance, 10.0); // rank-income table: index 0, silver = 10
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn s2_seven_pairs_then_one_more_steps_rank() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user(tx, "p");
            tx.execute(
                "UPDATE users SET rank_index_silver = 0, income_pairs_silver = 4, cutoff_pairs_silver = 3 WHERE id = 'p'",
                [],
            )?;
            on_pair_paid(tx, "p", PackageCode::Silver, 1)?;
            let (rank, income, cutoff): (i32, u32, u32) = tx.query_row(
                "SELECT rank_index_silver, income_pairs_silver, cutoff_pairs_silver FROM users WHERE id='p'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;
            assert_eq!(rank, 1);
            assert_eq!(income, 0);
            assert_eq!(cutoff, 0);
            let w = ledger::get_balance(tx, "p")?;
            assert_eq!(w.balance, 20.0);
            Ok(())
        })
        .unwrap();
    }
}
