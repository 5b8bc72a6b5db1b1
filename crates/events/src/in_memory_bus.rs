//! Process-local bus for committed ledger envelopes.

use std::sync::{Mutex, MutexGuard, PoisonError, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// A listener panicked while the subscriber list was held. The message
    /// stays in the outbox for catch-up.
    #[error("subscriber list lock poisoned")]
    Poisoned,
}

/// Delivers each published message to every live subscription, in publish
/// order. A subscription whose receiver was dropped is forgotten the next
/// time something is published.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    listeners: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<mpsc::Sender<M>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut listeners = self
            .listeners
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;
        listeners.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.listeners().push(tx);
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_a_copy_in_order() {
        let bus = InMemoryEventBus::<u64>::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(7).unwrap();
        bus.publish(8).unwrap();

        assert_eq!(a.drain(), vec![7, 8]);
        assert_eq!(b.drain(), vec![7, 8]);
    }

    #[test]
    fn publishing_without_listeners_is_a_no_op() {
        let bus = InMemoryEventBus::<u64>::new();
        bus.publish(1).unwrap();
        let late = bus.subscribe();
        assert!(late.drain().is_empty());
    }

    #[test]
    fn closed_subscriptions_are_forgotten_on_publish() {
        let bus = InMemoryEventBus::<u64>::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.listeners().len(), 2);

        bus.publish(1).unwrap();

        assert_eq!(bus.listeners().len(), 1);
        assert_eq!(kept.drain(), vec![1]);
    }
}
