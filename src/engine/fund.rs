//! §4.H Fund engine: monthly car/house pool distribution and the yearly
//! travel fund split. All credits go through the ledger substrate (§4.A);
//! selecting the actual travel-fund winners is explicitly out of scope
//! (§4.H: "outside the core") — this only records the national/international
//! split.

use rusqlite::{Transaction, params};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::ledger;
use crate::error::EngineResult;
use crate::model::fund::TravelAllocation;
use crate::model::plan::{RANK_DIAMOND_STAR, RANK_RUBY_STAR};
use crate::model::wallet::LedgerCategory;

fn eligible_users(tx: &Transaction, min_rank_index: i32) -> EngineResult<Vec<String>> {
    let mut stmt = tx.prepare(
        "SELECT id FROM users
         WHERE MAX(rank_index_silver, rank_index_gold, rank_index_ruby) >= ?1",
    )?;
    let rows = stmt.query_map(params![min_rank_index], |r| r.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// §4.H monthly car fund: eligible = rank >= Ruby Star in any package, shared
/// equally, pool reset to 0 regardless of whether anyone was eligible.
pub fn distribute_monthly_car_fund(tx: &Transaction, now: i64) -> EngineResult<f64> {
    distribute_monthly_pool(
        tx,
        "car_pool_monthly",
        RANK_RUBY_STAR,
        LedgerCategory::FundCar,
        "monthly car fund",
        now,
    )
}

/// §4.H monthly house fund: eligible = rank >= Diamond Star in any package.
pub fn distribute_monthly_house_fund(tx: &Transaction, now: i64) -> EngineResult<f64> {
    distribute_monthly_pool(
        tx,
        "house_pool_monthly",
        RANK_DIAMOND_STAR,
        LedgerCategory::FundHouse,
        "monthly house fund",
        now,
    )
}

fn distribute_monthly_pool(
    tx: &Transaction,
    pool_column: &str,
    min_rank_index: i32,
    category: LedgerCategory,
    note: &str,
    now: i64,
) -> EngineResult<f64> {
    let pool: f64 = tx.query_row(
        &format!("SELECT {pool_column} FROM fund_pool WHERE id = 1"),
        [],
        |r| r.get(0),
    )?;

    if pool > 0.0 {
        let winners = eligible_users(tx, min_rank_index)?;
        if !winners.is_empty() {
            let share = pool / winners.len() as f64;
            for user_id in &winners {
                ledger::credit(tx, user_id, share, category, &[], Some(note), now)?;
            }
        }
    }

    tx.execute(
        &format!("UPDATE fund_pool SET {pool_column} = 0 WHERE id = 1"),
        [],
    )?;
    tx.execute(
        "INSERT INTO fund_history (id, kind, amount, note, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![Uuid::new_v4().to_string(), pool_column, pool, note, now],
    )?;
    Ok(pool)
}

/// §4.H yearly travel fund: splits `total` by config shares and records the
/// allocation. Selecting actual winners happens outside this engine.
pub fn allocate_travel_fund(
    tx: &Transaction,
    config: &Config,
    year: i32,
    total: f64,
    now: i64,
) -> EngineResult<TravelAllocation> {
    let national_amount = total * config.travel_national_share;
    let international_amount = total * config.travel_international_share;
    let id = Uuid::new_v4().to_string();

    tx.execute(
        "INSERT INTO travel_allocations (id, year, national_amount, international_amount, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, year, national_amount, international_amount, now],
    )?;

    Ok(TravelAllocation {
        id,
        year,
        national_amount,
        international_amount,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    fn insert_user_with_rank(tx: &Transaction, id: &str, rank_ruby: i32) {
        tx.execute(
            "INSERT INTO users (id, display_code, rank_index_ruby, created_at) VALUES (?1, ?1, ?2, 0)",
            params![id, rank_ruby],
        )
        .unwrap();
    }

    #[test]
    fn car_fund_splits_equally_among_eligible_and_resets_pool() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user_with_rank(tx, "r1", RANK_RUBY_STAR);
            insert_user_with_rank(tx, "r2", RANK_RUBY_STAR);
            insert_user_with_rank(tx, "low", 0);
            tx.execute("UPDATE fund_pool SET car_pool_monthly = 100.0 WHERE id = 1", [])?;

            let paid = distribute_monthly_car_fund(tx, 1)?;
            assert_eq!(paid, 100.0);

            assert_eq!(ledger::get_balance(tx, "r1")?.balance, 50.0);
            assert_eq!(ledger::get_balance(tx, "r2")?.balance, 50.0);
            assert_eq!(ledger::get_balance(tx, "low")?.balance, 0.0);

            let remaining: f64 = tx.query_row(
                "SELECT car_pool_monthly FROM fund_pool WHERE id = 1",
                [],
                |r| r.get(0),
            )?;
            assert_eq!(remaining, 0.0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn travel_fund_splits_by_configured_shares() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        let config = Config::default();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            let allocation = allocate_travel_fund(tx, &config, 2026, 1000.0, 1)?;
            assert_eq!(allocation.national_amount, 600.0);
            assert_eq!(allocation.international_amount, 400.0);
            Ok(())
        })
        .unwrap();
    }
}
