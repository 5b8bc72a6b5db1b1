//! Stock engine: the application service behind every ledger operation.
//!
//! ## Execution Flow
//!
//! ```text
//! Command
//!   ↓
//! 1. Open a UnitOfWork (reads remember record versions)
//!   ↓
//! 2. Run domain logic, staging every write and outbox event
//!   ↓
//! 3. Commit the ChangeSet atomically (version + uniqueness checks)
//!   ↓  conflict → back to 1, up to `max_commit_retries` times
//! 4. Publish committed events to the bus
//! ```
//!
//! Nothing is published unless the commit succeeded. A failed publish is
//! logged and does not fail the operation; the outbox keeps the events.

mod accounts;
mod catalog;
pub mod commands;
mod error;
mod purchasing;
mod returns;
mod stock;

use serde_json::Value as JsonValue;
use tracing::{debug, error, warn};

use autoshop_events::{EventBus, EventEnvelope};
use autoshop_inventory::{
    CostLayerPolicy, CostedItem, InventoryEvent, PriceChangeId, StockMovement,
};
use autoshop_inventory::events::{CostLayerActivated, StockMoved};

use crate::config::EngineConfig;
use crate::store::{LedgerStore, StoreError, StoredEvent};
use crate::unit_of_work::UnitOfWork;

pub use accounts::payment_account;
pub use commands::*;
pub use error::{EngineError, EngineResult};

/// Orchestrates catalog, ledger, cost layer, purchasing and accounting
/// changes over a [`LedgerStore`], publishing committed events on an
/// [`EventBus`].
#[derive(Debug)]
pub struct StockEngine<S, B> {
    store: S,
    bus: B,
    config: EngineConfig,
}

impl<S, B> StockEngine<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self { store, bus, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }

    fn policy(&self) -> CostLayerPolicy {
        self.config.cost_layer_policy
    }
}

impl<S, B> StockEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run `op` in a fresh unit of work and commit it, re-running from fresh
    /// reads on optimistic conflicts.
    fn execute<T>(
        &self,
        operation: &'static str,
        mut op: impl FnMut(&mut UnitOfWork<'_, S>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut attempt: u32 = 0;
        loop {
            let mut uow = UnitOfWork::new(&self.store);
            let output = op(&mut uow)?;

            match self.store.commit(uow.into_changes()) {
                Ok(committed) => {
                    debug!(operation, attempt, events = committed.len(), "committed");
                    self.publish(&committed);
                    return Ok(output);
                }
                Err(StoreError::Conflict(reason)) if attempt < self.config.max_commit_retries => {
                    attempt += 1;
                    warn!(operation, attempt, %reason, "commit conflict, retrying");
                }
                Err(StoreError::Rejected(err)) => return Err(err.into()),
                Err(err) => {
                    if matches!(err, StoreError::Conflict(_)) {
                        warn!(operation, attempts = attempt + 1, "commit retries exhausted");
                    }
                    return Err(err.into());
                }
            }
        }
    }

    fn publish(&self, committed: &[StoredEvent]) {
        for event in committed {
            if let Err(err) = self.bus.publish(event.to_envelope()) {
                error!(
                    sequence_number = event.sequence_number,
                    event_type = %event.event_type,
                    error = ?err,
                    "event publication failed; event remains in the outbox"
                );
            }
        }
    }
}

fn stock_moved(movement: &StockMovement) -> InventoryEvent {
    InventoryEvent::StockMoved(StockMoved {
        item_id: movement.item_id,
        movement_id: movement.id,
        movement_type: movement.movement_type,
        quantity: movement.quantity,
        new_qty: movement.new_qty,
        unit_price: movement.unit_price,
        occurred_at: movement.recorded_at,
    })
}

/// Events for layers promoted during an operation, in promotion order.
fn activations(costed: &CostedItem, ids: &[PriceChangeId]) -> Vec<InventoryEvent> {
    ids.iter()
        .filter_map(|id| costed.price_changes().iter().find(|r| r.id == *id))
        .filter_map(|record| {
            record.effective_from.map(|at| {
                InventoryEvent::CostLayerActivated(CostLayerActivated {
                    item_id: record.item_id,
                    record_id: record.id,
                    previous_price: record.previous_price,
                    new_price: record.new_price,
                    occurred_at: at,
                })
            })
        })
        .collect()
}
