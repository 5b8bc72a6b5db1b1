//! Infrastructure layer: configuration, the ledger store, units of work and
//! the stock engine that ties the domain crates together.

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod store;
pub mod unit_of_work;


pub use bootstrap::{InMemoryEngine, from_env, in_memory};
pub use config::{AppConfig, EngineConfig};
pub use engine::{EngineError, EngineResult, StockEngine};
pub use store::{InMemoryLedgerStore, LedgerStore, StoreError, StoredEvent};
pub use unit_of_work::UnitOfWork;
