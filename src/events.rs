//! Explicit event bus for the core (§9 Design Notes): replaces the
//! "sprawling services calling each other synchronously" pattern with
//! declared events and handlers registered up front, so the BV fan-out in
//! §4.G is testable in isolation and the rank engine never needs to import
//! the session engine (or vice versa).
//!
//! Everything here runs *inside* the same SQLite transaction as the
//! triggering write (a pair credit, a BV credit) — dispatch is synchronous
//! and handlers receive the open `rusqlite::Transaction`, mirroring the
//! teacher's in-process trait-object registry (`engine::Engine` dispatching
//! to `Box<dyn Venue>` handlers) rather than an out-of-process message queue.

use rusqlite::Transaction;

use crate::error::EngineResult;
use crate::model::PackageCode;

#[derive(Debug, Clone)]
pub struct ActivationEvent {
    pub user_id: String,
    pub package_code: PackageCode,
    pub activated_at: i64,
}

#[derive(Debug, Clone)]
pub struct BvCreditedEvent {
    pub user_id: String,
    pub bv_amount: f64,
    pub source: String,
    pub franchise_referrer_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct PairPaidEvent {
    pub user_id: String,
    pub package_code: PackageCode,
    pub session_run_id: String,
    pub created_at: i64,
}

pub enum Event {
    Activation(ActivationEvent),
    BvCredited(BvCreditedEvent),
    PairPaid(PairPaidEvent),
}

pub trait Handler: Send + Sync {
    fn handle(&self, tx: &Transaction, event: &Event) -> EngineResult<()>;
}

#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Box<dyn Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, tx: &Transaction, event: Event) -> EngineResult<()> {
        for handler in &self.handlers {
            handler.handle(tx, &event)?;
        }
        Ok(())
    }
}
