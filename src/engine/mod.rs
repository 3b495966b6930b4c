pub mod activation;
pub mod admin;
pub mod bv;
pub mod distributor;
pub mod epin;
pub mod franchise;
pub mod fund;
pub mod ledger;
pub mod placement;
pub mod rank;
pub mod registration;
pub mod scheduler;
pub mod session;

use crate::config::Config;
use crate::events::EventBus;
use crate::store::Db;

/// Owns the shared connection, event wiring, and config — the compensation
/// domain's counterpart to the teacher's workflow `Engine`, which owned the
/// venue map and balances the same way.
pub struct Engine {
    pub db: Db,
    pub bus: EventBus,
    pub config: Config,
}

impl Engine {
    pub fn new(db: Db, config: Config) -> Self {
        let mut bus = EventBus::new();
        bus.register(Box::new(rank::RankHandler));
        bus.register(Box::new(distributor::Distributor::new(config.clone())));
        Engine { db, bus, config }
    }
}
