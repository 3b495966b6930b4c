//! §4.C Placement store: BFS allocator over the binary tree with atomic
//! slot reservation. Concurrency is handled by SQLite's own transaction
//! serialization (`process::mod` holds one global connection mutex), which
//! plays the role of the spec's "compare-and-set on the root's preferred
//! side" — an `UPDATE ... WHERE child IS NULL` either affects one row (won
//! the slot) or zero (lost the race, continue BFS).

use std::collections::VecDeque;

use rusqlite::{Transaction, params};

use crate::error::{EngineError, EngineResult};
use crate::model::user::Side;

fn try_reserve_slot(
    tx: &Transaction,
    parent_id: &str,
    side: Side,
    new_user_id: &str,
) -> EngineResult<bool> {
    let sql = match side {
        Side::L => "UPDATE users SET left_child_id = ?1 WHERE id = ?2 AND left_child_id IS NULL",
        Side::R => "UPDATE users SET right_child_id = ?1 WHERE id = ?2 AND right_child_id IS NULL",
    };
    let affected = tx.execute(sql, params![new_user_id, parent_id])?;
    if affected == 1 {
        tx.execute(
            "UPDATE users SET placement_parent_id = ?1, placement_side = ?2 WHERE id = ?3",
            params![parent_id, side.as_str(), new_user_id],
        )?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn children_of(tx: &Transaction, user_id: &str) -> EngineResult<(Option<String>, Option<String>)> {
    let row = tx.query_row(
        "SELECT left_child_id, right_child_id FROM users WHERE id = ?1",
        params![user_id],
        |r| Ok((r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?)),
    )?;
    Ok(row)
}

/// Places `new_user_id` under the subtree rooted at `placement_id` (falling
/// back to `sponsor_id`), trying `preferred_side` first at every candidate,
/// BFS level by level, insertion order within a level (§4.C).
pub fn place_user(
    tx: &Transaction,
    new_user_id: &str,
    sponsor_id: Option<&str>,
    placement_id: Option<&str>,
    preferred_side: Option<Side>,
) -> EngineResult<(String, Side)> {
    let root = placement_id
        .or(sponsor_id)
        .ok_or_else(|| EngineError::Validation("NoPlacementRoot".to_string()))?
        .to_string();
    let preferred = preferred_side.unwrap_or(Side::L);

    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(root);

    while let Some(candidate) = queue.pop_front() {
        for side in [preferred, preferred.other()] {
            if try_reserve_slot(tx, &candidate, side, new_user_id)? {
                return Ok((candidate, side));
            }
        }
        let (left, right) = children_of(tx, &candidate)?;
        if let Some(l) = left {
            queue.push_back(l);
        }
        if let Some(r) = right {
            queue.push_back(r);
        }
    }

    Err(EngineError::Validation("NoSlot".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;

    fn insert_user(tx: &Transaction, id: &str) {
        tx.execute(
            "INSERT INTO users (id, display_code, created_at) VALUES (?1, ?1, 0)",
            params![id],
        )
        .unwrap();
    }

    #[test]
    fn places_under_preferred_side_first() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user(tx, "root");
            insert_user(tx, "a");
            let (parent, side) = place_user(tx, "a", Some("root"), None, Some(Side::L))?;
            assert_eq!(parent, "root");
            assert_eq!(side, Side::L);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn falls_through_to_other_side_when_preferred_taken() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            insert_user(tx, "root");
            insert_user(tx, "a");
            insert_user(tx, "b");
            place_user(tx, "a", Some("root"), None, Some(Side::L))?;
            let (parent, side) = place_user(tx, "b", Some("root"), None, Some(Side::L))?;
            assert_eq!(parent, "root");
            assert_eq!(side, Side::R);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn bfs_spills_into_subtree_when_root_full() {
        let db = store::open_in_memory().unwrap();
        let mut conn = db.blocking_lock();
        crate::store::tx::run_in_tx(&mut conn, |tx| {
            for id in ["root", "a", "b", "c"] {
                insert_user(tx, id);
            }
            place_user(tx, "a", Some("root"), None, Some(Side::L))?;
            place_user(tx, "b", Some("root"), None, Some(Side::L))?;
            let (parent, _side) = place_user(tx, "c", Some("root"), None, Some(Side::L))?;
            assert!(parent == "a" || parent == "b");
            Ok(())
        })
        .unwrap();
    }
}
