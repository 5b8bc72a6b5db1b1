//! Supplier returns.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult, GrnId, SupplierId, extend};
use autoshop_inventory::{InventoryItemId, MovementType, StockMovement, StockMovementId};

autoshop_core::domain_id!(
    /// Item return identifier.
    ItemReturnId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Processed,
    Canceled,
}

/// How the supplier settles a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// Refund at the original unit price.
    Cash,
    /// Goods swapped one for one.
    Replacement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReturn {
    id: ItemReturnId,
    grn_id: GrnId,
    item_id: InventoryItemId,
    origin_movement: StockMovementId,
    supplier_id: SupplierId,
    quantity: i64,
    unit_price: Decimal,
    reason: String,
    status: ReturnStatus,
    return_type: Option<ReturnType>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ItemReturn {
    /// Open a pending return against the `In` movement a GRN produced.
    pub fn issue(
        id: ItemReturnId,
        grn_id: GrnId,
        supplier_id: SupplierId,
        origin: &StockMovement,
        quantity: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if origin.movement_type != MovementType::In || origin.grn_id != Some(grn_id) {
            return Err(DomainError::validation(format!(
                "movement {} is not a receipt on grn {grn_id}",
                origin.id
            )));
        }
        if quantity <= 0 || quantity > origin.quantity {
            return Err(DomainError::invalid_quantity(format!(
                "return quantity must be between 1 and {}, got {quantity}",
                origin.quantity
            )));
        }

        Ok(Self {
            id,
            grn_id,
            item_id: origin.item_id,
            origin_movement: origin.id,
            supplier_id,
            quantity,
            unit_price: origin.unit_price,
            reason: reason.trim().to_string(),
            status: ReturnStatus::Pending,
            return_type: None,
            processed_at: None,
            created_at: at,
        })
    }

    pub fn id(&self) -> ItemReturnId {
        self.id
    }

    pub fn grn_id(&self) -> GrnId {
        self.grn_id
    }

    pub fn item_id(&self) -> InventoryItemId {
        self.item_id
    }

    pub fn origin_movement(&self) -> StockMovementId {
        self.origin_movement
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> ReturnStatus {
        self.status
    }

    pub fn return_type(&self) -> Option<ReturnType> {
        self.return_type
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Refund value at the original unit price.
    pub fn value(&self) -> DomainResult<Decimal> {
        extend(self.quantity, self.unit_price)
    }

    /// Whether this return blocks another one on the same movement.
    pub fn is_live(&self) -> bool {
        self.status != ReturnStatus::Canceled
    }

    pub fn process(&mut self, return_type: ReturnType, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending()?;
        self.status = ReturnStatus::Processed;
        self.return_type = Some(return_type);
        self.processed_at = Some(at);
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending()?;
        self.status = ReturnStatus::Canceled;
        self.processed_at = Some(at);
        Ok(())
    }

    fn ensure_pending(&self) -> DomainResult<()> {
        match self.status {
            ReturnStatus::Pending => Ok(()),
            other => Err(DomainError::already_processed(format!(
                "return {} is {other:?}",
                self.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoshop_inventory::NewMovement;
    use rust_decimal_macros::dec;

    fn receipt(grn_id: GrnId, quantity: i64) -> StockMovement {
        StockMovement::record(
            StockMovementId::generate(),
            0,
            NewMovement::new(InventoryItemId::generate(), MovementType::In, quantity, dec!(42.50))
                .with_grn(grn_id, SupplierId::generate()),
            Utc::now(),
        )
        .unwrap()
    }

    fn issue(qty: i64) -> DomainResult<ItemReturn> {
        let grn = GrnId::generate();
        ItemReturn::issue(
            ItemReturnId::generate(),
            grn,
            SupplierId::generate(),
            &receipt(grn, 6),
            qty,
            " cracked housing ",
            Utc::now(),
        )
    }

    #[test]
    fn issue_values_at_receipt_price() {
        let r = issue(4).unwrap();
        assert_eq!(r.status(), ReturnStatus::Pending);
        assert_eq!(r.unit_price(), dec!(42.50));
        assert_eq!(r.value().unwrap(), dec!(170.00));
        assert_eq!(r.reason(), "cracked housing");
    }

    #[test]
    fn quantity_must_fit_the_receipt() {
        assert!(matches!(issue(0), Err(DomainError::InvalidQuantity(_))));
        assert!(matches!(issue(7), Err(DomainError::InvalidQuantity(_))));
        assert!(issue(6).is_ok());
    }

    #[test]
    fn movement_from_another_grn_is_rejected() {
        let err = ItemReturn::issue(
            ItemReturnId::generate(),
            GrnId::generate(),
            SupplierId::generate(),
            &receipt(GrnId::generate(), 3),
            1,
            "wrong part",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn only_pending_returns_transition() {
        let mut r = issue(1).unwrap();
        r.process(ReturnType::Cash, Utc::now()).unwrap();
        assert_eq!(r.return_type(), Some(ReturnType::Cash));
        assert!(matches!(
            r.process(ReturnType::Cash, Utc::now()),
            Err(DomainError::AlreadyProcessed(_))
        ));
        assert!(matches!(r.cancel(Utc::now()), Err(DomainError::AlreadyProcessed(_))));

        let mut c = issue(1).unwrap();
        c.cancel(Utc::now()).unwrap();
        assert!(!c.is_live());
    }
}
