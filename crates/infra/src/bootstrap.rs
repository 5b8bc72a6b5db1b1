//! Wiring for embedding the engine in a process.

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value as JsonValue;
use tracing::info;

use autoshop_events::{EventEnvelope, InMemoryEventBus};

use crate::config::AppConfig;
use crate::engine::StockEngine;
use crate::store::InMemoryLedgerStore;

pub type InMemoryEngine =
    StockEngine<Arc<InMemoryLedgerStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

/// Engine over the in-memory store and bus.
pub fn in_memory(config: &AppConfig) -> InMemoryEngine {
    let store = Arc::new(InMemoryLedgerStore::new(config.engine.currency.clone()));
    let bus = Arc::new(InMemoryEventBus::new());
    StockEngine::new(store, bus, config.engine.clone())
}

/// Load configuration, install logging and build an in-memory engine.
pub fn from_env() -> anyhow::Result<InMemoryEngine> {
    let config = AppConfig::load().context("failed to load configuration")?;
    autoshop_observability::init(&config.logging);
    info!(
        environment = %config.environment,
        currency = %config.engine.currency,
        policy = ?config.engine.cost_layer_policy,
        "stock engine starting"
    );
    Ok(in_memory(&config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_engine_uses_configured_currency() {
        let mut config = AppConfig::default();
        config.engine.currency = "LKR".to_string();

        let engine = in_memory(&config);
        let summary = engine.account_summary().unwrap();

        assert_eq!(summary.len(), 7);
        assert!(summary.iter().all(|b| b.currency == "LKR"));
        assert_eq!(engine.config().currency, "LKR");
    }
}
