use chrono::{DateTime, Utc};

/// A domain event emitted by a ledger operation.
///
/// Events are facts: immutable, versioned by schema, and appended in commit
/// order to the store's outbox before anyone sees them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "inventory.stock.moved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Business time of the operation that produced the event.
    fn occurred_at(&self) -> DateTime<Utc>;
}
