//! Ledger persistence boundary.
//!
//! The store owns every record the engine writes and commits an
//! operation's [`ChangeSet`] atomically, with optimistic version checks.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{ChangeSet, LedgerStore, Staged, StoreError, StoredEvent, UncommittedEvent};
