use thiserror::Error;

/// Error kinds per §7. `AlreadyProcessed` is a *successful no-op* at engine
/// boundaries, not an exception — callers match on it explicitly rather than
/// treating it as failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already processed: {0}")]
    AlreadyProcessed(String),

    #[error("insufficient balance: user {user_id} has {available}, needs {needed}")]
    InsufficientBalance {
        user_id: String,
        available: f64,
        needed: f64,
    },

    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("insufficient pool: {0}")]
    InsufficientPool(String),

    #[error("conflict, retry: {0}")]
    Conflict(String),

    #[error("fatal invariant violation: {0}")]
    Fatal(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn is_already_processed(&self) -> bool {
        matches!(self, EngineError::AlreadyProcessed(_))
    }

    /// True for a `Conflict` or for a store-level SQLITE_BUSY/SQLITE_LOCKED
    /// (another process holding the file, e.g. a backup or admin CLI against
    /// the same path) — both are worth a bounded retry rather than surfacing
    /// straight to the caller (§7).
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Conflict(_) => true,
            EngineError::Store(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
