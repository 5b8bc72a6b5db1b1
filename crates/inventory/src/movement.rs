use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult, GrnId, SupplierId, UserId, extend};

use crate::item::InventoryItemId;

autoshop_core::domain_id!(
    /// Stock movement identifier.
    StockMovementId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
    /// Goods sent back to a supplier.
    Return,
}

impl MovementType {
    /// Sign applied to the quantity when summing the ledger.
    pub fn sign(self) -> i64 {
        match self {
            MovementType::In => 1,
            MovementType::Out | MovementType::Return => -1,
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Return => "return",
        })
    }
}

/// Immutable stock ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub item_id: InventoryItemId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub previous_qty: i64,
    pub new_qty: i64,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    pub grn_id: Option<GrnId>,
    pub supplier_id: Option<SupplierId>,
    pub performed_by: Option<UserId>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Movement request, before quantities are resolved against the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub item_id: InventoryItemId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub grn_id: Option<GrnId>,
    pub supplier_id: Option<SupplierId>,
    pub performed_by: Option<UserId>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl NewMovement {
    pub fn new(
        item_id: InventoryItemId,
        movement_type: MovementType,
        quantity: i64,
        unit_price: Decimal,
    ) -> Self {
        Self {
            item_id,
            movement_type,
            quantity,
            unit_price,
            grn_id: None,
            supplier_id: None,
            performed_by: None,
            reference: None,
            notes: None,
        }
    }

    pub fn with_grn(mut self, grn_id: GrnId, supplier_id: SupplierId) -> Self {
        self.grn_id = Some(grn_id);
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn performed_by(mut self, user: Option<UserId>) -> Self {
        self.performed_by = user;
        self
    }
}

impl StockMovement {
    /// Resolve a movement against the on-hand quantity it applies to.
    pub fn record(
        id: StockMovementId,
        previous_qty: i64,
        new: NewMovement,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if new.quantity <= 0 {
            return Err(DomainError::invalid_quantity(format!(
                "movement quantity must be positive, got {}",
                new.quantity
            )));
        }
        let new_qty = previous_qty
            .checked_add(new.movement_type.sign() * new.quantity)
            .ok_or_else(|| {
                DomainError::invalid_quantity(format!(
                    "{} of {} on top of {previous_qty} overflows",
                    new.movement_type, new.quantity
                ))
            })?;
        if new_qty < 0 {
            return Err(DomainError::InsufficientStock {
                requested: new.quantity,
                available: previous_qty,
            });
        }

        let total_value = extend(new.quantity, new.unit_price)?;

        Ok(Self {
            id,
            item_id: new.item_id,
            movement_type: new.movement_type,
            quantity: new.quantity,
            previous_qty,
            new_qty,
            unit_price: new.unit_price,
            total_value,
            grn_id: new.grn_id,
            supplier_id: new.supplier_id,
            performed_by: new.performed_by,
            reference: new.reference,
            notes: new.notes,
            recorded_at: at,
        })
    }

    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.sign() * self.quantity
    }
}

/// Ledger lookup criteria. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub item_id: Option<InventoryItemId>,
    pub supplier_id: Option<SupplierId>,
    pub grn_id: Option<GrnId>,
    pub movement_type: Option<MovementType>,
}

impl MovementFilter {
    pub fn for_item(item_id: InventoryItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn for_supplier(supplier_id: SupplierId) -> Self {
        Self {
            supplier_id: Some(supplier_id),
            ..Self::default()
        }
    }

    pub fn for_grn(grn_id: GrnId) -> Self {
        Self {
            grn_id: Some(grn_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, movement: &StockMovement) -> bool {
        self.item_id.is_none_or(|id| movement.item_id == id)
            && self.supplier_id.is_none_or(|id| movement.supplier_id == Some(id))
            && self.grn_id.is_none_or(|id| movement.grn_id == Some(id))
            && self.movement_type.is_none_or(|t| movement.movement_type == t)
    }
}

/// Signed sum of a sequence of movements.
pub fn ledger_sum<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements.into_iter().map(StockMovement::signed_quantity).sum()
}

/// Stored quantity next to the quantity implied by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReconciliation {
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub ledger_quantity: i64,
    pub movement_count: usize,
}

impl StockReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.quantity == self.ledger_quantity
    }

    /// Stored minus ledger.
    pub fn drift(&self) -> i64 {
        self.quantity.saturating_sub(self.ledger_quantity)
    }
}
