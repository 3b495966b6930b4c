//! §4.B BV/PV ledger: BV credit/consumption with fund-pool allocation, and
//! PV entry creation (a new red PV entry per placement, not a counter).

use rusqlite::{Transaction, params};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::events::{BvCreditedEvent, Event, EventBus};
use crate::model::plan::PackageCode;
use crate::model::pv::PvState;
use crate::model::user::Side;

pub(crate) fn get_cto_bv(tx: &Transaction) -> EngineResult<f64> {
    Ok(tx.query_row("SELECT total_cto_bv FROM fund_pool WHERE id = 1", [], |r| {
        r.get(0)
    })?)
}

/// Appends a BV ledger row, allocates car/house pool shares, and
/// synchronously fans out to the BV distributor via the event bus (§4.B,
/// §4.G). All one transaction.
#[allow(clippy::too_many_arguments)]
pub fn credit_bv(
    tx: &Transaction,
    bus: &EventBus,
    config: &Config,
    user_id: &str,
    bv_amount: f64,
    source: &str,
    franchise_referrer_id: Option<&str>,
    now: i64,
) -> EngineResult<String> {
    if bv_amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "BV credit amount must be positive, got {bv_amount}"
        )));
    }
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO bv_ledger (id, user_id, signed_amount, source, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, user_id, bv_amount, source, now],
    )?;

    let car_share = bv_amount * config.car_pool_percent / 100.0;
    let house_share = bv_amount * config.house_pool_percent / 100.0;
    tx.execute(
        "UPDATE fund_pool SET
            total_cto_bv = total_cto_bv + ?1,
            car_pool_monthly = car_pool_monthly + ?2,
            house_pool_monthly = house_pool_monthly + ?3
         WHERE id = 1",
        params![bv_amount, car_share, house_share],
    )?;

    bus.dispatch(
        tx,
        Event::BvCredited(BvCreditedEvent {
            user_id: user_id.to_string(),
            bv_amount,
            source: source.to_string(),
            franchise_referrer_id: franchise_referrer_id.map(|s| s.to_string()),
            created_at: now,
        }),
    )?;

    Ok(id)
}

/// Appends a negative BV row; CTO BV is clamped at 0 (§4.B, §8 invariant 7).
pub fn consume_bv(tx: &Transaction, user_id: &str, bv_amount: f64, source: &str, now: i64) -> EngineResult<String> {
    if bv_amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "BV consumption amount must be positive, got {bv_amount}"
        )));
    }
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO bv_ledger (id, user_id, signed_amount, source, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, user_id, -bv_amount, source, now],
    )?;

    let current = get_cto_bv(tx)?;
    let clamped = (current - bv_amount).max(0.0);
    tx.execute(
        "UPDATE fund_pool SET total_cto_bv = ?1 WHERE id = 1",
        params![clamped],
    )?;
    Ok(id)
}

/// Creates a new red PV entry on the given leg (§4.B). Each activation or
/// PV-giving event creates one; this is not a counter update.
pub fn credit_pv(
    tx: &Transaction,
    user_id: &str,
    package_code: PackageCode,
    pv_amount: f64,
    side: Side,
    now: i64,
) -> EngineResult<String> {
    if pv_amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "PV amount must be positive, got {pv_amount}"
        )));
    }
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO pv_entries (id, owner_user_id, package_code, side, pv, state, created_at, locked)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
        params![
            id,
            user_id,
            package_code.as_str(),
            side.as_str(),
            pv_amount,
            PvState::Red.as_str(),
            now
        ],
    )?;
    Ok(id)
}
