use rusqlite::Connection;

use crate::error::{EngineError, EngineResult};

/// The teacher's Design Notes (§9) ask for a small transactional
/// abstraction: `f` sees a consistent snapshot and all writes commit or none
/// do. SQLite gives us real transactions, so this is a thin wrapper around
/// `Connection::transaction` rather than a CAS-then-append fallback.
pub fn run_in_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&rusqlite::Transaction) -> EngineResult<T>,
) -> EngineResult<T> {
    let tx = conn.transaction().map_err(EngineError::from)?;
    let result = f(&tx)?;
    tx.commit().map_err(EngineError::from)?;
    Ok(result)
}

/// Bounded retry for CAS-style conflicts (§7: `Conflict` is retried
/// internally a bounded number of times before being surfaced as `Retry`).
/// Also retries a store-level SQLITE_BUSY/SQLITE_LOCKED, which is the
/// practical way a transient conflict shows up through `rusqlite` when
/// something else holds the database file (see `EngineError::is_transient`).
pub fn with_bounded_retry<T>(
    attempts: u32,
    mut f: impl FnMut() -> EngineResult<T>,
) -> EngineResult<T> {
    let mut last_err = None;
    for _ in 0..attempts {
        match f() {
            Ok(v) => return Ok(v),
            Err(err) if err.is_transient() => last_err = Some(err),
            Err(other) => return Err(other),
        }
    }
    Err(last_err.unwrap_or_else(|| EngineError::Conflict("retry budget exhausted".into())))
}
