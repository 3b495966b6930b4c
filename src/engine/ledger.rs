//! §4.A Ledger substrate: append-only wallet ledger with hold/release/finalize
//! semantics. Every function here runs inside the caller's transaction, so
//! the wallet-row update and the ledger append are always one atomic unit —
//! SQLite's own transaction gives us this directly rather than needing the
//! "CAS wallet, then append ledger" fallback the Design Notes describe for
//! stores without multi-document transactions.

use rusqlite::{OptionalExtension, Transaction, params};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::wallet::{LedgerCategory, LedgerDirection, Wallet};

pub fn ensure_wallet(tx: &Transaction, user_id: &str) -> EngineResult<()> {
    tx.execute(
        "INSERT OR IGNORE INTO wallets (user_id, balance, pending, total_credited, total_debited)
         VALUES (?1, 0, 0, 0, 0)",
        params![user_id],
    )?;
    Ok(())
}

pub fn get_balance(tx: &Transaction, user_id: &str) -> EngineResult<Wallet> {
    ensure_wallet(tx, user_id)?;
    let wallet = tx
        .query_row(
            "SELECT balance, pending, total_credited, total_debited FROM wallets WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Wallet {
                    balance: row.get(0)?,
                    pending: row.get(1)?,
                    total_credited: row.get(2)?,
                    total_debited: row.get(3)?,
                })
            },
        )
        .optional()?
        .unwrap_or_default();
    Ok(wallet)
}

fn append_ledger_row(
    tx: &Transaction,
    user_id: &str,
    direction: LedgerDirection,
    amount: f64,
    category: LedgerCategory,
    balance_after: f64,
    refs: &[String],
    note: Option<&str>,
    now: i64,
) -> EngineResult<String> {
    let tx_id = Uuid::new_v4().to_string();
    let refs_json = serde_json::to_string(refs).unwrap_or_else(|_| "[]".to_string());
    tx.execute(
        "INSERT INTO wallet_ledger
            (tx_id, user_id, direction, amount, category, balance_after, related_entry_ids, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            tx_id,
            user_id,
            direction.as_str(),
            amount,
            category.as_str(),
            balance_after,
            refs_json,
            note,
            now
        ],
    )?;
    Ok(tx_id)
}

/// Fails only if `amount <= 0` (§4.A).
pub fn credit(
    tx: &Transaction,
    user_id: &str,
    amount: f64,
    category: LedgerCategory,
    refs: &[String],
    note: Option<&str>,
    now: i64,
) -> EngineResult<String> {
    if amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "credit amount must be positive, got {amount}"
        )));
    }
    let wallet = get_balance(tx, user_id)?;
    let new_balance = wallet.balance + amount;
    let new_total_credited = wallet.total_credited + amount;
    tx.execute(
        "UPDATE wallets SET balance = ?1, total_credited = ?2 WHERE user_id = ?3",
        params![new_balance, new_total_credited, user_id],
    )?;
    append_ledger_row(
        tx,
        user_id,
        LedgerDirection::Credit,
        amount,
        category,
        new_balance,
        refs,
        note,
        now,
    )
}

/// Fails with `InsufficientBalance` if `wallet.balance < amount`.
pub fn debit(
    tx: &Transaction,
    user_id: &str,
    amount: f64,
    category: LedgerCategory,
    refs: &[String],
    note: Option<&str>,
    now: i64,
) -> EngineResult<String> {
    if amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "debit amount must be positive, got {amount}"
        )));
    }
    let wallet = get_balance(tx, user_id)?;
    if wallet.balance < amount {
        return Err(EngineError::InsufficientBalance {
            user_id: user_id.to_string(),
            available: wallet.balance,
            needed: amount,
        });
    }
    let new_balance = wallet.balance - amount;
    let new_total_debited = wallet.total_debited + amount;
    tx.execute(
        "UPDATE wallets SET balance = ?1, total_debited = ?2 WHERE user_id = ?3",
        params![new_balance, new_total_debited, user_id],
    )?;
    append_ledger_row(
        tx,
        user_id,
        LedgerDirection::Debit,
        amount,
        category,
        new_balance,
        refs,
        note,
        now,
    )
}

/// Moves `amount` from balance -> pending. Fails if `balance < amount`.
pub fn hold(tx: &Transaction, user_id: &str, amount: f64, refs: &[String], now: i64) -> EngineResult<String> {
    if amount <= 0.0 {
        return Err(EngineError::Validation(format!(
            "hold amount must be positive, got {amount}"
        )));
    }
    let wallet = get_balance(tx, user_id)?;
    if wallet.balance < amount {
        return Err(EngineError::InsufficientBalance {
            user_id: user_id.to_string(),
            available: wallet.balance,
            needed: amount,
        });
    }
    let new_balance = wallet.balance - amount;
    let new_pending = wallet.pending + amount;
    tx.execute(
        "UPDATE wallets SET balance = ?1, pending = ?2 WHERE user_id = ?3",
        params![new_balance, new_pending, user_id],
    )?;
    append_ledger_row(
        tx,
        user_id,
        LedgerDirection::Hold,
        amount,
        LedgerCategory::Withdraw,
        new_balance,
        refs,
        None,
        now,
    )
}

/// Pending -> balance. Fails if `pending < amount`.
pub fn release(tx: &Transaction, user_id: &str, amount: f64, now: i64) -> EngineResult<String> {
    let wallet = get_balance(tx, user_id)?;
    if wallet.pending < amount {
        return Err(EngineError::InsufficientBalance {
            user_id: user_id.to_string(),
            available: wallet.pending,
            needed: amount,
        });
    }
    let new_balance = wallet.balance + amount;
    let new_pending = wallet.pending - amount;
    tx.execute(
        "UPDATE wallets SET balance = ?1, pending = ?2 WHERE user_id = ?3",
        params![new_balance, new_pending, user_id],
    )?;
    append_ledger_row(
        tx,
        user_id,
        LedgerDirection::Release,
        amount,
        LedgerCategory::Withdraw,
        new_balance,
        &[],
        None,
        now,
    )
}

/// Pending -> gone, `total_debited` increments. Fails if `pending < amount`.
pub fn finalize(tx: &Transaction, user_id: &str, amount: f64, now: i64) -> EngineResult<String> {
    let wallet = get_balance(tx, user_id)?;
    if wallet.pending < amount {
        return Err(EngineError::InsufficientBalance {
            user_id: user_id.to_string(),
            available: wallet.pending,
            needed: amount,
        });
    }
    let new_pending = wallet.pending - amount;
    let new_total_debited = wallet.total_debited + amount;
    tx.execute(
        "UPDATE wallets SET pending = ?1, total_debited = ?2 WHERE user_id = ?3",
        params![new_pending, new_total_debited, user_id],
    )?;
    append_ledger_row(
        tx,
        user_id,
        LedgerDirection::Finalize,
        amount,
        LedgerCategory::Withdraw,
        wallet.balance,
        &[],
        None,
        now,
    )
}

/// Reconciliation job (§4.A contract): recomputes the signed ledger sum for
/// a user and compares against `balance + pending`. A mismatch is `Fatal`
/// (§7) — never auto-corrected.
pub fn reconcile(tx: &Transaction, user_id: &str) -> EngineResult<()> {
    let wallet = get_balance(tx, user_id)?;
    let mut stmt = tx.prepare(
        "SELECT direction, amount FROM wallet_ledger WHERE user_id = ?1",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        let direction: String = row.get(0)?;
        let amount: f64 = row.get(1)?;
        Ok((direction, amount))
    })?;

    let mut signed_sum = 0.0;
    for row in rows {
        let (direction, amount) = row?;
        let direction = LedgerDirection::from_str(&direction).ok_or_else(|| {
            EngineError::Fatal(format!("unrecognized ledger direction {direction}"))
        })?;
        signed_sum += direction.signed_sum_sign() * amount;
    }

    let expected = wallet.balance + wallet.pending;
    if (signed_sum - expected).abs() > 1e-6 {
        return Err(EngineError::Fatal(format!(
            "ledger-wallet mismatch for user {user_id}: ledger sum {signed_sum}, wallet balance+pending {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    #[test]
    fn credit_then_debit_keeps_balance_consistent() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, created_at) VALUES ('u1','U1',0)",
                params![],
            )
            .unwrap();
            credit(tx, "u1", 100.0, LedgerCategory::Admin, &[], None, 1)?;
            debit(tx, "u1", 40.0, LedgerCategory::Admin, &[], None, 2)?;
            let w = get_balance(tx, "u1")?;
            assert_eq!(w.balance, 60.0);
            reconcile(tx, "u1")
        })
        .unwrap();
    }

    #[test]
    fn debit_more_than_balance_fails() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        let result = crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, created_at) VALUES ('u1','U1',0)",
                params![],
            )
            .unwrap();
            credit(tx, "u1", 10.0, LedgerCategory::Admin, &[], None, 1)?;
            debit(tx, "u1", 50.0, LedgerCategory::Admin, &[], None, 2)
        });
        assert!(matches!(result, Err(EngineError::InsufficientBalance { .. })));
    }
}
