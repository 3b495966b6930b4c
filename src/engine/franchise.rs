//! §4.K Franchise engine: atomic stock decrement, sale record, holder
//! commission, and a BV credit to the buyer that fans out through the
//! distributor (§4.G) — which is also where the referrer's 1% share is
//! credited, since `BvCreditedEvent.franchise_referrer_id` already covers it.

use rusqlite::{OptionalExtension, Transaction, params};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::{bv, ledger};
use crate::error::{EngineError, EngineResult};
use crate::events::EventBus;
use crate::model::franchise::Sale;
use crate::model::plan::FRANCHISE_HOLDER_MIN_PERCENT;
use crate::model::wallet::LedgerCategory;

/// §4.K sale flow. Credits touch at most two wallets (holder, buyer via BV
/// fan-out); both happen inside the caller's single transaction, so the
/// ascending-user-id lock ordering §5 asks for is moot here — SQLite's one
/// connection already serializes the whole operation.
pub fn sell(
    tx: &Transaction,
    bus: &EventBus,
    config: &Config,
    franchise_id: &str,
    product_id: &str,
    buyer_user_id: &str,
    now: i64,
) -> EngineResult<Sale> {
    let affected = tx.execute(
        "UPDATE franchise_products SET stock = stock - 1 WHERE id = ?1 AND stock > 0",
        params![product_id],
    )?;
    if affected == 0 {
        return Err(EngineError::InsufficientStock(format!(
            "product {product_id} is out of stock"
        )));
    }

    let (sale_price, bv_equivalent): (f64, f64) = tx.query_row(
        "SELECT sale_price, bv_equivalent FROM franchise_products WHERE id = ?1",
        params![product_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    let (owner_user_id, referrer_user_id, holder_percent): (String, Option<String>, f64) = tx
        .query_row(
            "SELECT owner_user_id, referrer_user_id, holder_percent FROM franchises WHERE id = ?1",
            params![franchise_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| EngineError::NotFound(format!("franchise {franchise_id}")))?;
    let holder_percent = holder_percent.max(FRANCHISE_HOLDER_MIN_PERCENT);

    let holder_commission = sale_price * holder_percent;
    ledger::credit(
        tx,
        &owner_user_id,
        holder_commission,
        LedgerCategory::FranchiseHolder,
        &[],
        Some("franchise sale commission"),
        now,
    )?;

    bv::credit_bv(
        tx,
        bus,
        config,
        buyer_user_id,
        bv_equivalent,
        "franchise",
        referrer_user_id.as_deref(),
        now,
    )?;

    let referrer_income = if referrer_user_id.is_some() {
        bv_equivalent * crate::model::plan::FRANCHISE_REFERRER_PERCENT
    } else {
        0.0
    };

    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO franchise_sales
            (id, franchise_id, product_id, buyer_user_id, sale_price, bv_equivalent, holder_commission, referrer_income, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            franchise_id,
            product_id,
            buyer_user_id,
            sale_price,
            bv_equivalent,
            holder_commission,
            referrer_income,
            now
        ],
    )?;

    Ok(Sale {
        id,
        franchise_id: franchise_id.to_string(),
        product_id: product_id.to_string(),
        buyer_user_id: buyer_user_id.to_string(),
        sale_price,
        bv_equivalent,
        holder_commission,
        referrer_income,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    #[test]
    fn sale_decrements_stock_and_pays_holder_and_referrer() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        let bus = EventBus::new();
        let config = Config::default();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            for id in ["owner", "referrer", "buyer"] {
                tx.execute(
                    "INSERT INTO users (id, display_code, created_at) VALUES (?1, ?1, 0)",
                    params![id],
                )
                .unwrap();
            }
            tx.execute(
                "INSERT INTO franchises (id, owner_user_id, referrer_user_id, holder_percent, created_at)
                 VALUES ('f1', 'owner', 'referrer', 0.05, 0)",
                params![],
            )?;
            tx.execute(
                "INSERT INTO franchise_products (id, franchise_id, name, stock, sale_price, bv_equivalent)
                 VALUES ('p1', 'f1', 'Widget', 1, 100.0, 100.0)",
                params![],
            )?;

            let sale = sell(tx, &bus, &config, "f1", "p1", "buyer", 1)?;
            assert_eq!(sale.holder_commission, 5.0);
            assert_eq!(sale.referrer_income, 1.0);

            let stock: i64 =
                tx.query_row("SELECT stock FROM franchise_products WHERE id = 'p1'", [], |r| r.get(0))?;
            assert_eq!(stock, 0);

            assert_eq!(ledger::get_balance(tx, "owner")?.balance, 5.0);
            assert_eq!(ledger::get_balance(tx, "referrer")?.balance, 1.0);

            let out_of_stock = sell(tx, &bus, &config, "f1", "p1", "buyer", 2);
            assert!(matches!(out_of_stock, Err(EngineError::InsufficientStock(_))));
            Ok(())
        })
        .unwrap();
    }
}
