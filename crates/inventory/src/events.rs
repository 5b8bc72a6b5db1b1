use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::GrnId;
use autoshop_events::Event;

use crate::cost_layer::PriceChangeId;
use crate::item::InventoryItemId;
use crate::movement::{MovementType, StockMovementId};

/// Aggregate type recorded on inventory event envelopes.
pub const AGGREGATE_TYPE: &str = "inventory.item";

/// Event: ItemRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRegistered {
    pub item_id: InventoryItemId,
    pub code: String,
    pub name: String,
    pub opening_quantity: i64,
    pub buying_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub item_id: InventoryItemId,
    /// Set when the selling price changed.
    pub selling_price: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockMoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMoved {
    pub item_id: InventoryItemId,
    pub movement_id: StockMovementId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub new_qty: i64,
    pub unit_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CostLayerDeferred (a received price waits behind the active layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayerDeferred {
    pub item_id: InventoryItemId,
    pub record_id: PriceChangeId,
    pub grn_id: Option<GrnId>,
    pub new_price: Decimal,
    pub margin_qty: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CostLayerActivated (the item's buying price changed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayerActivated {
    pub item_id: InventoryItemId,
    pub record_id: PriceChangeId,
    pub previous_price: Decimal,
    pub new_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemRegistered(ItemRegistered),
    ItemUpdated(ItemUpdated),
    StockMoved(StockMoved),
    CostLayerDeferred(CostLayerDeferred),
    CostLayerActivated(CostLayerActivated),
}

impl InventoryEvent {
    pub fn item_id(&self) -> InventoryItemId {
        match self {
            InventoryEvent::ItemRegistered(e) => e.item_id,
            InventoryEvent::ItemUpdated(e) => e.item_id,
            InventoryEvent::StockMoved(e) => e.item_id,
            InventoryEvent::CostLayerDeferred(e) => e.item_id,
            InventoryEvent::CostLayerActivated(e) => e.item_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemRegistered(_) => "inventory.item.registered",
            InventoryEvent::ItemUpdated(_) => "inventory.item.updated",
            InventoryEvent::StockMoved(_) => "inventory.stock.moved",
            InventoryEvent::CostLayerDeferred(_) => "inventory.cost_layer.deferred",
            InventoryEvent::CostLayerActivated(_) => "inventory.cost_layer.activated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemRegistered(e) => e.occurred_at,
            InventoryEvent::ItemUpdated(e) => e.occurred_at,
            InventoryEvent::StockMoved(e) => e.occurred_at,
            InventoryEvent::CostLayerDeferred(e) => e.occurred_at,
            InventoryEvent::CostLayerActivated(e) => e.occurred_at,
        }
    }
}
