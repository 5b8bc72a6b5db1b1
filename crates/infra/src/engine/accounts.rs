//! Account summary and outbox queries.

use serde_json::Value as JsonValue;

use autoshop_accounting::{AccountBalance, AccountType};
use autoshop_events::{EventBus, EventEnvelope};
use autoshop_purchasing::PaymentMethod;

use super::{EngineResult, StockEngine};
use crate::store::{LedgerStore, StoredEvent};

/// Balance account a payment method moves money through.
pub fn payment_account(method: PaymentMethod) -> AccountType {
    match method {
        PaymentMethod::Cash => AccountType::Cash,
        PaymentMethod::Bank => AccountType::Bank,
        PaymentMethod::CreditCard => AccountType::CreditCard,
    }
}

impl<S, B> StockEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Every account balance, zero-initialised, in the configured currency.
    pub fn account_summary(&self) -> EngineResult<Vec<AccountBalance>> {
        Ok(self.store.balances()?.snapshot())
    }

    /// Committed events after `sequence`, for listeners catching up.
    pub fn events_since(&self, sequence: u64, limit: usize) -> EngineResult<Vec<StoredEvent>> {
        Ok(self.store.events_since(sequence, limit)?)
    }
}
