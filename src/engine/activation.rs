//! §4.D Activation service: consumes an EPIN or payment reference, activates
//! a package, places PV on the user's leg, credits BV (fanning out through
//! the distributor via the event bus), and materializes any PendingIncome
//! rows queued for this package by an earlier silver-pair-green event
//! (§4.E "Silver pair unlocks Gold/Ruby").

use rusqlite::{OptionalExtension, Transaction, params};

use crate::config::Config;
use crate::engine::{bv, epin, ledger};
use crate::error::{EngineError, EngineResult};
use crate::events::EventBus;
use crate::model::plan::PackageCode;
use crate::model::user::Side;
use crate::model::wallet::LedgerCategory;

pub struct ActivationRequest<'a> {
    pub user_id: &'a str,
    pub package_code: PackageCode,
    pub epin_code: Option<&'a str>,
    pub payment_ref: Option<&'a str>,
}

pub struct ActivationResult {
    pub pv_entry_id: String,
    pub bv_ledger_id: Option<String>,
    pub materialized_pending: f64,
}

/// Runs all of §4.D step 1-8 in the caller's transaction.
pub fn activate(
    tx: &Transaction,
    bus: &EventBus,
    config: &Config,
    req: &ActivationRequest,
    now: i64,
) -> EngineResult<ActivationResult> {
    let plan = req.package_code.plan();

    match req.epin_code {
        Some(code) => epin::consume(tx, code, req.user_id, now)?,
        None => {
            if req.payment_ref.is_none() {
                return Err(EngineError::Validation("PaymentRequired".to_string()));
            }
        }
    }

    let placement: Option<(Option<String>, Option<String>)> = tx
        .query_row(
            "SELECT placement_parent_id, placement_side FROM users WHERE id = ?1",
            params![req.user_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let (parent_id, side) = match placement {
        Some((Some(parent_id), Some(side))) => {
            (parent_id, if side == "R" { Side::R } else { Side::L })
        }
        // A root user with no placement parent (the tree's origin) banks its
        // own PV — there is no upline leg for it to sit on.
        _ => (req.user_id.to_string(), Side::L),
    };

    tx.execute(
        "UPDATE users SET active_package = ?1, package_activated_at = ?2 WHERE id = ?3",
        params![req.package_code.as_str(), now, req.user_id],
    )?;

    // PV accumulates on the placement parent's leg (§4.C places users by leg;
    // §4.E pairs are found per owner across both legs), not on the activating
    // user's own row — a single user can never hold PV on both their own legs.
    let pv_entry_id = bv::credit_pv(tx, &parent_id, req.package_code, plan.pv, side, now)?;

    let bv_ledger_id = if plan.bv > 0.0 {
        Some(bv::credit_bv(
            tx,
            bus,
            config,
            req.user_id,
            plan.bv,
            "activation",
            None,
            now,
        )?)
    } else {
        None
    };

    let materialized_pending = materialize_pending_income(tx, req.user_id, req.package_code, now)?;

    Ok(ActivationResult {
        pv_entry_id,
        bv_ledger_id,
        materialized_pending,
    })
}

/// §4.D step 8 / §4.E cross-package rule: credit any PendingIncome rows
/// queued for this (user, package) and mark them materialized.
fn materialize_pending_income(
    tx: &Transaction,
    user_id: &str,
    pkg: PackageCode,
    now: i64,
) -> EngineResult<f64> {
    let mut stmt = tx.prepare(
        "SELECT id, amount FROM pending_income
         WHERE user_id = ?1 AND package_code = ?2 AND materialized = 0",
    )?;
    let rows: Vec<(String, f64)> = stmt
        .query_map(params![user_id, pkg.as_str()], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    let mut total = 0.0;
    for (id, amount) in rows {
        let affected = tx.execute(
            "UPDATE pending_income SET materialized = 1 WHERE id = ?1 AND materialized = 0",
            params![id],
        )?;
        if affected == 1 {
            ledger::credit(
                tx,
                user_id,
                amount,
                LedgerCategory::Binary,
                &[],
                Some("materialized pending income from earlier silver pair"),
                now,
            )?;
            total += amount;
        }
    }
    Ok(total)
}
