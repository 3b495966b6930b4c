use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::engine::Engine;
use crate::events::EventBus;
use crate::store::Db;

/// Shared app state for the admin HTTP surface. Mirrors the teacher's
/// `AppState { inner: Arc<RwLock<AppStateInner>> }` shape; there are no
/// per-connection sessions here (no auth/signup surface, §1), just the one
/// `Engine` every handler reaches into.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<RwLock<AppStateInner>>,
}

pub struct AppStateInner {
    pub db: Db,
    pub bus: EventBus,
    pub config: Config,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        AppState {
            inner: Arc::new(RwLock::new(AppStateInner {
                db: engine.db,
                bus: engine.bus,
                config: engine.config,
            })),
        }
    }
}
