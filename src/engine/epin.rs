//! §4.J EPIN lifecycle: generation, transfer, reservation, and consumption.
//! `isUsed=true` is terminal (§3 EPIN invariant); every state change here is
//! a single `UPDATE ... WHERE` guard so two workers racing on the same code
//! can't both win (§5 "EPIN rows: single writer via CAS on isUsed").

use rand::Rng;
use rusqlite::{OptionalExtension, Transaction, params};

use crate::error::{EngineError, EngineResult};
use crate::model::plan::PackageCode;

const CODE_LEN: usize = 12;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Atomic batch insert of unique codes (§4.J `generate`).
pub fn generate(
    tx: &Transaction,
    qty: u32,
    package_code: PackageCode,
    created_by: &str,
    now: i64,
) -> EngineResult<Vec<String>> {
    let mut codes = Vec::with_capacity(qty as usize);
    for _ in 0..qty {
        loop {
            let code = generate_code();
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO epins (code, package_code, owner_user_id, is_used, created_by, created_at)
                 VALUES (?1, ?2, NULL, 0, ?3, ?4)",
                params![code, package_code.as_str(), created_by, now],
            )?;
            if inserted == 1 {
                codes.push(code);
                break;
            }
        }
    }
    Ok(codes)
}

/// Reassigns ownership. Unlimited transfers, no expiry; fails only if the
/// code is already used (§4.J `transfer`).
pub fn transfer(tx: &Transaction, code: &str, to_user_id: &str, now: i64) -> EngineResult<()> {
    let _ = now;
    let affected = tx.execute(
        "UPDATE epins SET owner_user_id = ?1, transfer_count = transfer_count + 1
         WHERE code = ?2 AND is_used = 0",
        params![to_user_id, code],
    )?;
    if affected == 0 {
        return Err(not_found_or_used(tx, code)?);
    }
    Ok(())
}

/// Marks a temporary owner during an in-flight order (§4.J `reserve`).
pub fn reserve(tx: &Transaction, code: &str, user_id: &str) -> EngineResult<()> {
    let affected = tx.execute(
        "UPDATE epins SET owner_user_id = ?1 WHERE code = ?2 AND is_used = 0",
        params![user_id, code],
    )?;
    if affected == 0 {
        return Err(not_found_or_used(tx, code)?);
    }
    Ok(())
}

/// Consumes a code for activation (§4.D step 2, §4.J `consume`). Fails
/// `NotFound` if the code doesn't exist, `Validation` if assigned to a
/// different user, `AlreadyProcessed` if already used.
pub fn consume(tx: &Transaction, code: &str, user_id: &str, now: i64) -> EngineResult<()> {
    let row: Option<(Option<String>, bool)> = tx
        .query_row(
            "SELECT owner_user_id, is_used FROM epins WHERE code = ?1",
            params![code],
            |r| Ok((r.get(0)?, r.get::<_, i64>(1)? != 0)),
        )
        .optional()?;

    let Some((owner, is_used)) = row else {
        return Err(EngineError::NotFound(format!("epin {code}")));
    };
    if is_used {
        return Err(EngineError::AlreadyProcessed(format!("epin {code} already used")));
    }
    if let Some(owner) = &owner {
        if owner != user_id {
            return Err(EngineError::Validation(format!(
                "epin {code} is assigned to a different user"
            )));
        }
    }

    let affected = tx.execute(
        "UPDATE epins SET is_used = 1, used_by_user_id = ?1, used_at = ?2, owner_user_id = ?1
         WHERE code = ?3 AND is_used = 0",
        params![user_id, now, code],
    )?;
    if affected == 0 {
        return Err(EngineError::AlreadyProcessed(format!("epin {code} already used")));
    }
    Ok(())
}

fn not_found_or_used(tx: &Transaction, code: &str) -> EngineResult<EngineError> {
    let exists: Option<bool> = tx
        .query_row(
            "SELECT is_used FROM epins WHERE code = ?1",
            params![code],
            |r| Ok(r.get::<_, i64>(0)? != 0),
        )
        .optional()?;
    Ok(match exists {
        None => EngineError::NotFound(format!("epin {code}")),
        Some(_) => EngineError::AlreadyProcessed(format!("epin {code} already used")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    #[test]
    fn generate_then_consume() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, created_at) VALUES ('u1','U1',0)",
                params![],
            )
            .unwrap();
            let codes = generate(tx, 1, PackageCode::Silver, "admin", 0)?;
            assert_eq!(codes.len(), 1);
            consume(tx, &codes[0], "u1", 1)?;
            let result = consume(tx, &codes[0], "u1", 2);
            assert!(matches!(result, Err(EngineError::AlreadyProcessed(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn transfer_then_consume_by_new_owner() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            for id in ["a", "b"] {
                tx.execute(
                    "INSERT INTO users (id, display_code, created_at) VALUES (?1, ?1, 0)",
                    params![id],
                )
                .unwrap();
            }
            let codes = generate(tx, 1, PackageCode::Gold, "admin", 0)?;
            transfer(tx, &codes[0], "a", 1)?;
            transfer(tx, &codes[0], "b", 2)?;
            consume(tx, &codes[0], "b", 3)?;
            let err = consume(tx, &codes[0], "a", 4);
            assert!(matches!(err, Err(EngineError::AlreadyProcessed(_))));
            Ok(())
        })
        .unwrap();
    }
}
