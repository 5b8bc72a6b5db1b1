use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use autoshop_accounting::{AccountBalances, Posting};
use autoshop_core::{
    AggregateId, DomainError, ExpectedVersion, GrnId, Page, SupplierId, Versioned,
};
use autoshop_events::EventEnvelope;
use autoshop_inventory::{
    CostedItem, InventoryItemId, MovementFilter, SellingPriceChange, StockMovement,
    StockMovementId,
};
use autoshop_purchasing::{Grn, ItemReturn, ItemReturnId, Payment, Supplier};

/// An outbox entry staged by an operation (not yet assigned a sequence
/// number).
///
/// ## Event Lifecycle
///
/// 1. **Domain event**: built by the engine from a domain outcome
/// 2. **UncommittedEvent**: serialized with its aggregate metadata
/// 3. **StoredEvent**: committed with a global sequence number
/// 4. **EventEnvelope**: published to the event bus for listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Serialize a typed domain event, capturing the metadata needed to
    /// deserialize it later.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event: &E,
    ) -> Result<Self, StoreError>
    where
        E: autoshop_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| StoreError::Serialization(format!("event payload: {e}")))?;

        Ok(Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// A committed outbox entry.
///
/// ## Sequence Numbers
///
/// Assigned by the store at commit and:
/// - **Global**: one sequence across every aggregate
/// - **Gap-free**: each event gets the previous number plus one
/// - **Immutable**: never reassigned
///
/// Listeners resume from the last number they saw via
/// [`LedgerStore::events_since`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Position in the global outbox.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Convert a stored event into an envelope for publication.
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.event_type.clone(),
            self.sequence_number,
            self.occurred_at,
            self.payload.clone(),
        )
    }
}

/// Store operation error.
///
/// Commit and backend failures. Business rules are checked before anything
/// reaches the store, except running totals, which only the store can see.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record changed since it was read, or a uniqueness constraint was
    /// taken concurrently. Re-running the operation may succeed.
    #[error("commit conflict: {0}")]
    Conflict(String),

    /// The backend cannot serve requests (e.g. poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A running total (account balance or supplier due) cannot absorb the
    /// change set.
    #[error("rejected: {0}")]
    Rejected(#[from] DomainError),
}

/// A record write guarded by the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged<T> {
    pub value: T,
    pub expected: ExpectedVersion,
}

impl<T> Staged<T> {
    pub fn new(value: T, expected: ExpectedVersion) -> Self {
        Self { value, expected }
    }
}

/// Everything one operation writes, committed atomically.
///
/// Record writes carry an [`ExpectedVersion`]. Account postings and
/// supplier due changes are deltas and never conflict.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub items: Vec<Staged<CostedItem>>,
    pub suppliers: Vec<Staged<Supplier>>,
    pub grns: Vec<Staged<Grn>>,
    pub returns: Vec<Staged<ItemReturn>>,
    pub supplier_due: Vec<(SupplierId, Decimal)>,
    pub movements: Vec<StockMovement>,
    pub payments: Vec<Payment>,
    pub postings: Vec<Posting>,
    pub selling_price_changes: Vec<SellingPriceChange>,
    pub events: Vec<UncommittedEvent>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.suppliers.is_empty()
            && self.grns.is_empty()
            && self.returns.is_empty()
            && self.supplier_due.is_empty()
            && self.movements.is_empty()
            && self.payments.is_empty()
            && self.postings.is_empty()
            && self.selling_price_changes.is_empty()
            && self.events.is_empty()
    }
}

/// Persistence boundary of the stock engine.
///
/// ## Design Principles
///
/// - **No storage assumptions**: the in-memory store backs tests and
///   single-process deployments; a SQL backend fits the same contract
/// - **Optimistic locking**: via `ExpectedVersion` on every staged record
/// - **Append-only ledgers**: movements, payments, price journal and outbox
///   are never modified
///
/// ## Commit Semantics
///
/// `commit()` must, atomically:
/// - check every staged record against its expected version
/// - enforce uniqueness of item code and name (case-insensitive), GRN code,
///   supplier name, and one live return per stock movement
/// - apply balance postings and supplier due deltas
/// - append ledgers and outbox events, assigning sequence numbers
///
/// and either persist all of it or none of it. Version or uniqueness
/// failures surface as [`StoreError::Conflict`].
pub trait LedgerStore: Send + Sync {
    fn item(&self, id: InventoryItemId) -> Result<Option<Versioned<CostedItem>>, StoreError>;

    /// Case-insensitive code lookup.
    fn item_by_code(&self, code: &str) -> Result<Option<Versioned<CostedItem>>, StoreError>;

    /// First item whose code or name collides with the given ones, other
    /// than `exclude`.
    fn conflicting_item(
        &self,
        code: &str,
        name: &str,
        exclude: Option<InventoryItemId>,
    ) -> Result<Option<CostedItem>, StoreError>;

    /// All items in registration order.
    fn items(&self) -> Result<Vec<CostedItem>, StoreError>;

    fn supplier(&self, id: SupplierId) -> Result<Option<Versioned<Supplier>>, StoreError>;

    fn supplier_by_name(&self, name: &str) -> Result<Option<Supplier>, StoreError>;

    fn grn(&self, id: GrnId) -> Result<Option<Versioned<Grn>>, StoreError>;

    fn grn_by_code(&self, code: &str) -> Result<Option<Versioned<Grn>>, StoreError>;

    fn grn_count(&self) -> Result<u64, StoreError>;

    fn item_return(&self, id: ItemReturnId) -> Result<Option<Versioned<ItemReturn>>, StoreError>;

    fn returns_for_movement(&self, id: StockMovementId) -> Result<Vec<ItemReturn>, StoreError>;

    fn movement(&self, id: StockMovementId) -> Result<Option<StockMovement>, StoreError>;

    /// Matching movements, oldest first.
    fn movements(&self, filter: &MovementFilter, page: Page)
    -> Result<Vec<StockMovement>, StoreError>;

    fn payments(&self, supplier_id: SupplierId) -> Result<Vec<Payment>, StoreError>;

    fn selling_price_history(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<SellingPriceChange>, StoreError>;

    fn balances(&self) -> Result<AccountBalances, StoreError>;

    /// Outbox entries with a sequence number greater than `after`.
    fn events_since(&self, after: u64, limit: usize) -> Result<Vec<StoredEvent>, StoreError>;

    fn commit(&self, changes: ChangeSet) -> Result<Vec<StoredEvent>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn item(&self, id: InventoryItemId) -> Result<Option<Versioned<CostedItem>>, StoreError> {
        (**self).item(id)
    }

    fn item_by_code(&self, code: &str) -> Result<Option<Versioned<CostedItem>>, StoreError> {
        (**self).item_by_code(code)
    }

    fn conflicting_item(
        &self,
        code: &str,
        name: &str,
        exclude: Option<InventoryItemId>,
    ) -> Result<Option<CostedItem>, StoreError> {
        (**self).conflicting_item(code, name, exclude)
    }

    fn items(&self) -> Result<Vec<CostedItem>, StoreError> {
        (**self).items()
    }

    fn supplier(&self, id: SupplierId) -> Result<Option<Versioned<Supplier>>, StoreError> {
        (**self).supplier(id)
    }

    fn supplier_by_name(&self, name: &str) -> Result<Option<Supplier>, StoreError> {
        (**self).supplier_by_name(name)
    }

    fn grn(&self, id: GrnId) -> Result<Option<Versioned<Grn>>, StoreError> {
        (**self).grn(id)
    }

    fn grn_by_code(&self, code: &str) -> Result<Option<Versioned<Grn>>, StoreError> {
        (**self).grn_by_code(code)
    }

    fn grn_count(&self) -> Result<u64, StoreError> {
        (**self).grn_count()
    }

    fn item_return(&self, id: ItemReturnId) -> Result<Option<Versioned<ItemReturn>>, StoreError> {
        (**self).item_return(id)
    }

    fn returns_for_movement(&self, id: StockMovementId) -> Result<Vec<ItemReturn>, StoreError> {
        (**self).returns_for_movement(id)
    }

    fn movement(&self, id: StockMovementId) -> Result<Option<StockMovement>, StoreError> {
        (**self).movement(id)
    }

    fn movements(
        &self,
        filter: &MovementFilter,
        page: Page,
    ) -> Result<Vec<StockMovement>, StoreError> {
        (**self).movements(filter, page)
    }

    fn payments(&self, supplier_id: SupplierId) -> Result<Vec<Payment>, StoreError> {
        (**self).payments(supplier_id)
    }

    fn selling_price_history(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<SellingPriceChange>, StoreError> {
        (**self).selling_price_history(item_id)
    }

    fn balances(&self) -> Result<AccountBalances, StoreError> {
        (**self).balances()
    }

    fn events_since(&self, after: u64, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).events_since(after, limit)
    }

    fn commit(&self, changes: ChangeSet) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).commit(changes)
    }
}
