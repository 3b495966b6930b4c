//! §4.E Binary session engine — the core algorithm. Discovers unmatched PV
//! placements on a user's left and right legs, flips one matched pair per
//! package per session from red to green, credits pair income, and cascades
//! into the rank engine.
//!
//! Idempotency is a single `INSERT OR IGNORE` against the unique
//! `(date_key, session_index)` key on `session_runs`; per-user pair credits
//! each run in their own short transaction so that one user's failure
//! doesn't roll back pairs already committed for others in the same run
//! (§4.E Failure semantics, §5).

use rusqlite::{OptionalExtension, Transaction, params};
use uuid::Uuid;

use crate::engine::{ledger, rank};
use crate::error::EngineResult;
use crate::events::{Event, EventBus, PairPaidEvent};
use crate::model::plan::PackageCode;
use crate::model::pv::PvState;
use crate::model::user::Side;
use crate::store::Db;
use crate::store::tx::{run_in_tx, with_bounded_retry};

/// How many times a single user's pair-credit attempt retries a transient
/// store conflict before the session run just logs it and moves on (§7).
const PAIR_CREDIT_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct SessionRunResult {
    pub session_run_id: String,
    pub date_key: String,
    pub session_index: i32,
    pub new_pairs: u32,
    pub already_processed: bool,
}

/// Runs one (date_key, session_index) session. Returns
/// `already_processed: true` rather than erroring on a duplicate trigger
/// (§7: `AlreadyProcessed` is a successful no-op at the engine boundary).
pub async fn run_session(
    db: &Db,
    bus: &EventBus,
    date_key: &str,
    session_index: i32,
    now: i64,
) -> EngineResult<SessionRunResult> {
    let session_run_id = {
        let mut conn = db.lock().await;
        run_in_tx(&mut conn, |tx| insert_session_run(tx, date_key, session_index, now))?
    };

    let Some(session_run_id) = session_run_id else {
        tracing::info!(date_key, session_index, "session already processed");
        return Ok(SessionRunResult {
            session_run_id: String::new(),
            date_key: date_key.to_string(),
            session_index,
            new_pairs: 0,
            already_processed: true,
        });
    };

    let mut new_pairs = 0u32;

    // Silver -> gold -> ruby: this order matters because rank upgrades and
    // unlocks are observed across packages in this order (§4.E).
    for pkg in PackageCode::ALL_IN_PROCESSING_ORDER {
        let candidates = {
            let conn = db.lock().await;
            find_candidates(&conn, pkg)?
        };

        for user_id in candidates {
            let mut conn = db.lock().await;
            let outcome = with_bounded_retry(PAIR_CREDIT_RETRY_ATTEMPTS, || {
                run_in_tx(&mut conn, |tx| {
                    process_one_pair(tx, bus, &session_run_id, &user_id, pkg, session_index, now)
                })
            });
            match outcome {
                Ok(true) => new_pairs += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(user_id, ?pkg, %err, "pair credit failed, continuing session run");
                }
            }
        }
    }

    {
        let mut conn = db.lock().await;
        run_in_tx(&mut conn, |tx| {
            tx.execute(
                "UPDATE session_runs SET finished_at = ?1, finalized = 1 WHERE id = ?2",
                params![now, session_run_id],
            )?;
            Ok(())
        })?;
    }

    tracing::info!(date_key, session_index, new_pairs, "session run finalized");
    Ok(SessionRunResult {
        session_run_id,
        date_key: date_key.to_string(),
        session_index,
        new_pairs,
        already_processed: false,
    })
}

fn insert_session_run(
    tx: &Transaction,
    date_key: &str,
    session_index: i32,
    now: i64,
) -> EngineResult<Option<String>> {
    let id = Uuid::new_v4().to_string();
    let affected = tx.execute(
        "INSERT OR IGNORE INTO session_runs (id, date_key, session_index, started_at, finalized)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![id, date_key, session_index, now],
    )?;
    Ok(if affected == 1 { Some(id) } else { None })
}

/// Users with at least one red entry on each side for `pkg`, FIFO by
/// earliest red entry (§4.E step 1-2).
fn find_candidates(conn: &rusqlite::Connection, pkg: PackageCode) -> EngineResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT owner_user_id, MIN(created_at) AS earliest
         FROM pv_entries
         WHERE package_code = ?1 AND state = ?2
         GROUP BY owner_user_id
         HAVING
            SUM(CASE WHEN side = 'L' THEN 1 ELSE 0 END) > 0
            AND SUM(CASE WHEN side = 'R' THEN 1 ELSE 0 END) > 0
         ORDER BY earliest ASC",
    )?;
    let rows = stmt.query_map(params![pkg.as_str(), PvState::Red.as_str()], |r| r.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn earliest_red_id(tx: &Transaction, user_id: &str, pkg: PackageCode, side: Side) -> EngineResult<Option<String>> {
    Ok(tx
        .query_row(
            "SELECT id FROM pv_entries
             WHERE owner_user_id = ?1 AND package_code = ?2 AND side = ?3 AND state = ?4 AND locked = 0
             ORDER BY created_at ASC LIMIT 1",
            params![user_id, pkg.as_str(), side.as_str(), PvState::Red.as_str()],
            |r| r.get(0),
        )
        .optional()?)
}

fn try_lock(tx: &Transaction, entry_id: &str) -> EngineResult<bool> {
    let affected = tx.execute(
        "UPDATE pv_entries SET locked = 1 WHERE id = ?1 AND locked = 0 AND state = ?2",
        params![entry_id, PvState::Red.as_str()],
    )?;
    Ok(affected == 1)
}

fn unlock(tx: &Transaction, entry_id: &str) -> EngineResult<()> {
    tx.execute("UPDATE pv_entries SET locked = 0 WHERE id = ?1", params![entry_id])?;
    Ok(())
}

/// One candidate user, one package, one short transaction (§4.E step 2c).
/// Returns `Ok(true)` if a pair was credited, `Ok(false)` if skipped for a
/// benign reason (not active, cap reached, lock lost to a concurrent run).
fn process_one_pair(
    tx: &Transaction,
    bus: &EventBus,
    session_run_id: &str,
    user_id: &str,
    pkg: PackageCode,
    session_index: i32,
    now: i64,
) -> EngineResult<bool> {
    let active_package: Option<String> = tx
        .query_row(
            "SELECT active_package FROM users WHERE id = ?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?
        .flatten();
    if active_package.as_deref() != Some(pkg.as_str()) {
        return Ok(false);
    }

    let cap = pkg.plan().cap_per_session;
    let already_in_run: i64 = tx.query_row(
        "SELECT COUNT(*) FROM processed_pairs WHERE session_run_id = ?1 AND user_id = ?2 AND package_code = ?3",
        params![session_run_id, user_id, pkg.as_str()],
        |r| r.get(0),
    )?;
    if already_in_run as u32 >= cap {
        return Ok(false);
    }

    let Some(left_id) = earliest_red_id(tx, user_id, pkg, Side::L)? else {
        return Ok(false);
    };
    let Some(right_id) = earliest_red_id(tx, user_id, pkg, Side::R)? else {
        return Ok(false);
    };

    if !try_lock(tx, &left_id)? {
        return Ok(false);
    }
    if !try_lock(tx, &right_id)? {
        unlock(tx, &left_id)?;
        return Ok(false);
    }

    tx.execute(
        "UPDATE pv_entries SET state = ?1, matched_with_entry_id = ?2, session_matched_index = ?3, matched_at = ?4, locked = 0 WHERE id = ?5",
        params![PvState::Green.as_str(), right_id, session_index, now, left_id],
    )?;
    tx.execute(
        "UPDATE pv_entries SET state = ?1, matched_with_entry_id = ?2, session_matched_index = ?3, matched_at = ?4, locked = 0 WHERE id = ?5",
        params![PvState::Green.as_str(), left_id, session_index, now, right_id],
    )?;

    // Pair income is PV-derived; it does not touch BV, so it never triggers
    // the §4.G level-income fan-out.
    let amount = pkg.plan().pair_income;
    ledger::credit(
        tx,
        user_id,
        amount,
        crate::model::wallet::LedgerCategory::Binary,
        &[left_id.clone(), right_id.clone(), session_run_id.to_string()],
        None,
        now,
    )?;

    tx.execute(
        "INSERT INTO processed_pairs (id, session_run_id, user_id, package_code, left_entry_id, right_entry_id, amount, credited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            Uuid::new_v4().to_string(),
            session_run_id,
            user_id,
            pkg.as_str(),
            left_id,
            right_id,
            amount,
            now
        ],
    )?;

    bus.dispatch(
        tx,
        Event::PairPaid(PairPaidEvent {
            user_id: user_id.to_string(),
            package_code: pkg,
            session_run_id: session_run_id.to_string(),
            created_at: now,
        }),
    )?;

    if pkg == PackageCode::Silver {
        queue_pending_unlock(tx, user_id, PackageCode::Gold, now)?;
        queue_pending_unlock(tx, user_id, PackageCode::Ruby, now)?;
    }

    Ok(true)
}

/// "Silver pair unlocks Gold/Ruby" (§4.E): queue pending income for a
/// package the user doesn't yet own, to be materialized by the activation
/// service once they do (§4.D step 8).
fn queue_pending_unlock(tx: &Transaction, user_id: &str, pkg: PackageCode, now: i64) -> EngineResult<()> {
    tx.execute(
        "INSERT INTO pending_income (id, user_id, package_code, amount, materialized, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            Uuid::new_v4().to_string(),
            user_id,
            pkg.as_str(),
            pkg.plan().pair_income,
            now
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bv;
    use crate::store;

    fn setup_pair(tx: &Transaction, parent: &str) {
        tx.execute(
            "INSERT INTO users (id, display_code, active_package, created_at) VALUES (?1, ?1, 'silver', 0)",
            params![parent],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn s1_single_pair_paid_for_parent() {
        let db = store::open_in_memory().unwrap();
        let mut bus = EventBus::new();
        bus.register(Box::new(rank::RankHandler));
        let mut conn = db.lock().await;
        run_in_tx(&mut conn, |tx| {
            setup_pair(tx, "P");
            bv::credit_pv(tx, "P", PackageCode::Silver, 35.0, Side::L, 1)?;
            bv::credit_pv(tx, "P", PackageCode::Silver, 35.0, Side::R, 1)?;
            Ok(())
        })
        .unwrap();
        drop(conn);

        let result = run_session(&db, &bus, "2026-01-01", 1, 100).await.unwrap();
        assert_eq!(result.new_pairs, 1);
        assert!(!result.already_processed);

        let conn = db.lock().await;
        let balance: f64 = conn
            .query_row("SELECT balance FROM wallets WHERE user_id = 'P'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(balance, 10.0);
        let income_pairs: u32 = conn
            .query_row("SELECT income_pairs_silver FROM users WHERE id = 'P'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(income_pairs, 1);
    }

    #[tokio::test]
    async fn s3_session_idempotency() {
        let db = store::open_in_memory().unwrap();
        let mut bus = EventBus::new();
        bus.register(Box::new(rank::RankHandler));
        let mut conn = db.lock().await;
        run_in_tx(&mut conn, |tx| {
            setup_pair(tx, "P");
            bv::credit_pv(tx, "P", PackageCode::Silver, 35.0, Side::L, 1)?;
            bv::credit_pv(tx, "P", PackageCode::Silver, 35.0, Side::R, 1)?;
            Ok(())
        })
        .unwrap();
        drop(conn);

        let first = run_session(&db, &bus, "2026-01-02", 3, 100).await.unwrap();
        assert_eq!(first.new_pairs, 1);

        let second = run_session(&db, &bus, "2026-01-02", 3, 200).await.unwrap();
        assert!(second.already_processed);
        assert_eq!(second.new_pairs, 0);

        let conn = db.lock().await;
        let balance: f64 = conn
            .query_row("SELECT balance FROM wallets WHERE user_id = 'P'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(balance, 10.0);
    }
}
