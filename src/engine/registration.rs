//! Minimal entry point for the two calls an external signup/activation flow
//! needs (§1 excludes auth/signup/dashboards from scope, but the core still
//! has to expose something for those external flows to drive): inserting
//! the bare `User` row a sponsor refers, then placing it in the tree.
//! Everything past that — activation, PV, BV — is `activation::activate`.

use rusqlite::{Transaction, params};

use crate::engine::placement;
use crate::error::EngineResult;
use crate::model::user::Side;

/// Inserts the user row if it doesn't already exist, then places it under
/// `placement_id` (falling back to `sponsor_id`) via the BFS allocator.
pub fn register_and_place(
    tx: &Transaction,
    user_id: &str,
    display_code: &str,
    sponsor_id: Option<&str>,
    placement_id: Option<&str>,
    preferred_side: Option<Side>,
    now: i64,
) -> EngineResult<(String, Side)> {
    tx.execute(
        "INSERT OR IGNORE INTO users (id, display_code, sponsor_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, display_code, sponsor_id, now],
    )?;
    placement::place_user(tx, user_id, sponsor_id, placement_id, preferred_side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    #[test]
    fn registers_and_places_under_sponsor() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO users (id, display_code, created_at) VALUES ('root', 'ROOT', 0)",
                params![],
            )?;
            let (parent, side) =
                register_and_place(tx, "u1", "U1", Some("root"), None, Some(Side::L), 1)?;
            assert_eq!(parent, "root");
            assert_eq!(side, Side::L);
            Ok(())
        })
        .unwrap();
    }
}
