//! Inventory bounded context: item catalog, stock ledger records and the
//! cost layer manager.
//!
//! Pure domain logic. Persistence and concurrency live in `autoshop-infra`.

pub mod cost_layer;
pub mod events;
pub mod item;
pub mod movement;

pub use cost_layer::{
    BuyingPriceChange, Consumption, ConsumptionCost, CostLayerPolicy, CostPortion, CostedItem,
    IntakeOutcome, LayerOrigin, LayerReturn, PriceChangeId, PriceChangeStatus,
};
pub use events::InventoryEvent;
pub use item::{
    CategoryId, InventoryItem, InventoryItemId, ItemPatch, NewItem, SellingPriceChange,
    StockStatus, catalog_key,
};
pub use movement::{
    MovementFilter, MovementType, NewMovement, StockMovement, StockMovementId,
    StockReconciliation, ledger_sum,
};
