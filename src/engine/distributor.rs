//! §4.G BV distributor: per-event fan-out of BV to level income and the
//! royalty pool (registered on the event bus as the `BvCredited` handler),
//! plus the Level-Star bonus, which §4.G explicitly calls out as a separate
//! admin/cron-triggered computation rather than something every BV event
//! fires.

use rusqlite::{OptionalExtension, Transaction, params};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::{bv, ledger};
use crate::error::EngineResult;
use crate::events::{BvCreditedEvent, Event, Handler};
use crate::model::plan::{self};
use crate::model::wallet::LedgerCategory;

pub struct Distributor {
    config: Config,
}

impl Distributor {
    pub fn new(config: Config) -> Self {
        Distributor { config }
    }
}

impl Handler for Distributor {
    fn handle(&self, tx: &Transaction, event: &Event) -> EngineResult<()> {
        if let Event::BvCredited(e) = event {
            self.on_bv_credited(tx, e)?;
        }
        Ok(())
    }
}

impl Distributor {
    fn on_bv_credited(&self, tx: &Transaction, e: &BvCreditedEvent) -> EngineResult<()> {
        level_income(tx, &e.user_id, e.bv_amount, e.created_at)?;
        royalty_distribute(tx, &self.config, e.bv_amount, e.created_at)?;
        if let Some(referrer) = &e.franchise_referrer_id {
            let amount = e.bv_amount * plan::FRANCHISE_REFERRER_PERCENT;
            ledger::credit(
                tx,
                referrer,
                amount,
                LedgerCategory::FranchiseReferrer,
                &[],
                Some("franchise referrer BV share"),
                e.created_at,
            )?;
        }
        Ok(())
    }
}

fn sponsor_of(tx: &Transaction, user_id: &str) -> EngineResult<Option<String>> {
    let row: Option<Option<String>> = tx
        .query_row(
            "SELECT sponsor_id FROM users WHERE id = ?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(row.flatten())
}

/// Walks the sponsor chain (not the placement chain) for up to 10 levels,
/// crediting 0.5% of BV per level. Stops early if the chain terminates
/// (§4.G, §6, §8 invariant 10: total level income for one event <= 5% of B).
fn level_income(tx: &Transaction, originating_user: &str, bv_amount: f64, now: i64) -> EngineResult<()> {
    let mut current = originating_user.to_string();
    for level in 1..=plan::LEVEL_COUNT {
        let Some(sponsor) = sponsor_of(tx, &current)? else {
            break;
        };
        let amount = bv_amount * plan::LEVEL_INCOME_RATE;
        ledger::credit(
            tx,
            &sponsor,
            amount,
            LedgerCategory::Level,
            &[],
            Some(&format!("level {level} income")),
            now,
        )?;
        current = sponsor;
    }
    Ok(())
}

/// §4.G Royalty pool: star-cap phase then rank-percentage table, scaled
/// down proportionally if total desired exceeds the available pool (§8
/// invariant 9).
fn royalty_distribute(tx: &Transaction, config: &Config, bv_amount: f64, now: i64) -> EngineResult<()> {
    let pool = bv_amount * config.royalty_pool_percent / 100.0;
    if pool <= 0.0 {
        return Ok(());
    }

    let mut stmt = tx.prepare(
        "SELECT id, total_royalty_received, rank_index_silver FROM users
         WHERE active_package = 'silver'
         ORDER BY total_royalty_received ASC",
    )?;
    let eligible: Vec<(String, f64, i32)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    if eligible.is_empty() {
        return Ok(());
    }

    let desired: Vec<(String, f64)> = eligible
        .iter()
        .map(|(user_id, total_received, rank_index)| {
            let rate = if *total_received < plan::ROYALTY_STAR_CAP_PHASE_CEILING {
                plan::ROYALTY_STAR_CAP_RATE
            } else {
                plan::royalty_rank_rate(*rank_index)
            };
            (user_id.clone(), bv_amount * rate)
        })
        .collect();

    let total_desired: f64 = desired.iter().map(|(_, d)| d).sum();
    if total_desired <= 0.0 {
        return Ok(());
    }
    let scale = if total_desired > pool { pool / total_desired } else { 1.0 };

    let mut total_paid = 0.0;
    for (user_id, want) in desired {
        let paid = want * scale;
        if paid <= 0.0 {
            continue;
        }
        ledger::credit(tx, &user_id, paid, LedgerCategory::Royalty, &[], None, now)?;
        tx.execute(
            "INSERT INTO royalty_log (id, user_id, amount, rate, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![Uuid::new_v4().to_string(), user_id, paid, scale, now],
        )?;
        tx.execute(
            "UPDATE users SET total_royalty_received = total_royalty_received + ?1 WHERE id = ?2",
            params![paid, user_id],
        )?;
        total_paid += paid;
    }

    let current_cto = bv::get_cto_bv(tx)?;
    let clamped = (current_cto - total_paid).max(0.0);
    tx.execute("UPDATE fund_pool SET total_cto_bv = ?1 WHERE id = 1", params![clamped])?;
    Ok(())
}

fn direct_sponsorees(tx: &Transaction, parents: &[String]) -> EngineResult<Vec<String>> {
    if parents.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = parents.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("SELECT id FROM users WHERE sponsor_id IN ({placeholders})");
    let mut stmt = tx.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = parents.iter().map(|p| p as &dyn rusqlite::ToSql).collect();
    let rows = stmt.query_map(bound.as_slice(), |r| r.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// §4.G Level-Star bonus: admin/cron-triggered, independent thresholds on
/// direct-downline counts at sponsor levels 1-3.
pub fn level_star_bonus(tx: &Transaction, user_id: &str, cycle_cto_bv: f64, now: i64) -> EngineResult<()> {
    let level1 = direct_sponsorees(tx, std::slice::from_ref(&user_id.to_string()))?;
    let level2 = direct_sponsorees(tx, &level1)?;
    let level3 = direct_sponsorees(tx, &level2)?;

    if level1.len() as u32 >= plan::LEVEL_STAR_L1_THRESHOLD {
        ledger::credit(
            tx,
            user_id,
            cycle_cto_bv * plan::LEVEL_STAR_L1_RATE,
            LedgerCategory::Level,
            &[],
            Some("level-star bonus: 10 directs"),
            now,
        )?;
    }
    if level2.len() as u32 >= plan::LEVEL_STAR_L2_THRESHOLD {
        ledger::credit(
            tx,
            user_id,
            cycle_cto_bv * plan::LEVEL_STAR_L2_RATE,
            LedgerCategory::Level,
            &[],
            Some("level-star bonus: 70 second-level"),
            now,
        )?;
    }
    if level3.len() as u32 >= plan::LEVEL_STAR_L3_THRESHOLD {
        ledger::credit(
            tx,
            user_id,
            cycle_cto_bv * plan::LEVEL_STAR_L3_RATE,
            LedgerCategory::Level,
            &[],
            Some("level-star bonus: 200 third-level"),
            now,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    fn insert_user(tx: &Transaction, id: &str, sponsor: Option<&str>) {
        tx.execute(
            "INSERT INTO users (id, display_code, sponsor_id, created_at) VALUES (?1, ?1, ?2, 0)",
            params![id, sponsor],
        )
        .unwrap();
    }

    #[test]
    fn s4_level_income_across_three_sponsors() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user(tx, "s3", None);
            insert_user(tx, "s2", Some("s3"));
            insert_user(tx, "s1", Some("s2"));
            insert_user(tx, "u", Some("s1"));
            level_income(tx, "u", 155.0, 1)?;
            assert_eq!(ledger::get_balance(tx, "s1")?.balance, 0.775);
            assert_eq!(ledger::get_balance(tx, "s2")?.balance, 0.775);
            assert_eq!(ledger::get_balance(tx, "s3")?.balance, 0.775);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn s5_royalty_star_cap_transition() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        let config = Config::default();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user(tx, "r1", None);
            tx.execute(
                "UPDATE users SET active_package = 'silver', total_royalty_received = 34.0 WHERE id = 'r1'",
                [],
            )?;
            royalty_distribute(tx, &config, 100.0, 1)?;
            let w = ledger::get_balance(tx, "r1")?;
            assert!((w.balance - 2.0).abs() < 1e-9);
            let total: f64 = tx.query_row(
                "SELECT total_royalty_received FROM users WHERE id = 'r1'",
                [],
                |r| r.get(0),
            )?;
            assert!((total - 36.0).abs() < 1e-9);
            Ok(())
        })
        .unwrap();
    }
}
