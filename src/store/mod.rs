pub mod schema;
pub mod tx;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tokio::sync::Mutex;

/// Single SQLite connection shared across the process, mirroring the
/// teacher's `api/db.rs` `Db = Arc<Mutex<Connection>>` pattern. Every
/// "atomic" operation the spec describes becomes one transaction against
/// this connection (see `tx::run_in_tx`).
pub type Db = Arc<Mutex<Connection>>;

pub fn open(path: &Path) -> Result<Db> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("creating data directory")?;
        }
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening sqlite at {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
    schema::migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn open_in_memory() -> Result<Db> {
    let conn = Connection::open_in_memory().context("opening in-memory sqlite")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    schema::migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
