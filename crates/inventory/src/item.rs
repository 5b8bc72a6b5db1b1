use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult};

use crate::movement::StockMovement;

autoshop_core::domain_id!(
    /// Inventory item identifier.
    InventoryItemId
);

autoshop_core::domain_id!(
    /// Item category identifier (categories are owned by the catalog UI).
    CategoryId
);

/// Stock status, always derived from quantity and the reorder threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    pub fn derive(quantity: i64, reorder_threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= reorder_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Normalized form used for case-insensitive uniqueness of codes and names.
pub fn catalog_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category_id: CategoryId,
    pub quantity: i64,
    pub unit: String,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
    pub wholesale_price: Decimal,
    pub wholesale_threshold: i64,
    pub reorder_threshold: i64,
}

/// Partial update. There is deliberately no buying price here: the cost
/// layer manager is the only writer of `buying_price`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit: Option<String>,
    pub selling_price: Option<Decimal>,
    pub wholesale_price: Option<Decimal>,
    pub wholesale_threshold: Option<i64>,
    pub reorder_threshold: Option<i64>,
}

/// Journal entry for a selling-price change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellingPriceChange {
    pub item_id: InventoryItemId,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub changed_at: DateTime<Utc>,
}

/// Catalog entry with its on-hand quantity and current cost basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    code: String,
    name: String,
    category_id: CategoryId,
    quantity: i64,
    unit: String,
    buying_price: Decimal,
    selling_price: Decimal,
    wholesale_price: Decimal,
    wholesale_threshold: i64,
    reorder_threshold: i64,
    cost_layer_remaining: i64,
    status: StockStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Validate a registration and build the item.
    ///
    /// The opening quantity becomes the first cost layer at `buying_price`.
    /// The item starts at quantity zero; the caller records the opening
    /// stock as an `In` movement so the ledger accounts for it.
    pub fn register(id: InventoryItemId, new: NewItem, at: DateTime<Utc>) -> DomainResult<Self> {
        let code = new.code.trim().to_string();
        let name = new.name.trim().to_string();
        let unit = new.unit.trim().to_string();

        if code.is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if unit.is_empty() {
            return Err(DomainError::validation("unit cannot be empty"));
        }
        if new.quantity < 0 {
            return Err(DomainError::invalid_quantity("opening quantity cannot be negative"));
        }
        validate_price("buying price", new.buying_price)?;
        validate_price("selling price", new.selling_price)?;
        validate_price("wholesale price", new.wholesale_price)?;
        validate_threshold("wholesale threshold", new.wholesale_threshold)?;
        validate_threshold("reorder threshold", new.reorder_threshold)?;

        Ok(Self {
            id,
            code,
            name,
            category_id: new.category_id,
            quantity: 0,
            unit,
            buying_price: new.buying_price,
            selling_price: new.selling_price,
            wholesale_price: new.wholesale_price,
            wholesale_threshold: new.wholesale_threshold,
            reorder_threshold: new.reorder_threshold,
            cost_layer_remaining: new.quantity,
            status: StockStatus::derive(0, new.reorder_threshold),
            created_at: at,
            updated_at: at,
        })
    }

    pub fn id(&self) -> InventoryItemId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn buying_price(&self) -> Decimal {
        self.buying_price
    }

    pub fn selling_price(&self) -> Decimal {
        self.selling_price
    }

    pub fn wholesale_price(&self) -> Decimal {
        self.wholesale_price
    }

    pub fn wholesale_threshold(&self) -> i64 {
        self.wholesale_threshold
    }

    pub fn reorder_threshold(&self) -> i64 {
        self.reorder_threshold
    }

    /// Quantity left in the active cost layer.
    pub fn cost_layer_remaining(&self) -> i64 {
        self.cost_layer_remaining
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Unit sale price for an order of `quantity` units.
    pub fn sale_price_for(&self, quantity: i64) -> Decimal {
        if self.wholesale_threshold > 0 && quantity >= self.wholesale_threshold {
            self.wholesale_price
        } else {
            self.selling_price
        }
    }

    /// Whether `code` or `name` collides with this item (case-insensitive).
    pub fn collides_with(&self, code: &str, name: &str) -> bool {
        catalog_key(&self.code) == catalog_key(code) || catalog_key(&self.name) == catalog_key(name)
    }

    /// Apply a catalog patch. Returns the selling-price journal entry when
    /// the selling price changed.
    pub fn apply_patch(
        &mut self,
        patch: &ItemPatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<SellingPriceChange>> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if let Some(unit) = &patch.unit {
            if unit.trim().is_empty() {
                return Err(DomainError::validation("unit cannot be empty"));
            }
        }
        if let Some(price) = patch.selling_price {
            validate_price("selling price", price)?;
        }
        if let Some(price) = patch.wholesale_price {
            validate_price("wholesale price", price)?;
        }
        if let Some(threshold) = patch.wholesale_threshold {
            validate_threshold("wholesale threshold", threshold)?;
        }
        if let Some(threshold) = patch.reorder_threshold {
            validate_threshold("reorder threshold", threshold)?;
        }

        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(unit) = &patch.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(price) = patch.wholesale_price {
            self.wholesale_price = price;
        }
        if let Some(threshold) = patch.wholesale_threshold {
            self.wholesale_threshold = threshold;
        }
        if let Some(threshold) = patch.reorder_threshold {
            self.reorder_threshold = threshold;
        }

        let mut journal = None;
        if let Some(price) = patch.selling_price {
            if price != self.selling_price {
                journal = Some(SellingPriceChange {
                    item_id: self.id,
                    old_price: self.selling_price,
                    new_price: price,
                    changed_at: at,
                });
                self.selling_price = price;
            }
        }

        self.status = StockStatus::derive(self.quantity, self.reorder_threshold);
        self.updated_at = at;
        Ok(journal)
    }

    /// Move the on-hand quantity to the movement's `new_qty`.
    pub(crate) fn apply_movement(&mut self, movement: &StockMovement) -> DomainResult<()> {
        if movement.item_id != self.id {
            return Err(DomainError::invariant("movement belongs to a different item"));
        }
        if movement.previous_qty != self.quantity {
            return Err(DomainError::invariant(format!(
                "movement previous quantity {} does not match on-hand {}",
                movement.previous_qty, self.quantity
            )));
        }
        self.quantity = movement.new_qty;
        self.status = StockStatus::derive(self.quantity, self.reorder_threshold);
        self.updated_at = movement.recorded_at;
        Ok(())
    }

    pub(crate) fn set_buying_price(&mut self, price: Decimal) {
        self.buying_price = price;
    }

    /// Clamped at zero.
    pub(crate) fn set_cost_layer_remaining(&mut self, remaining: i64) {
        self.cost_layer_remaining = remaining.max(0);
    }
}

fn validate_price(label: &str, price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation(format!("{label} cannot be negative")));
    }
    Ok(())
}

fn validate_threshold(label: &str, threshold: i64) -> DomainResult<()> {
    if threshold < 0 {
        return Err(DomainError::validation(format!("{label} cannot be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn new_item(code: &str, quantity: i64) -> NewItem {
        NewItem {
            code: code.to_string(),
            name: format!("{code} part"),
            category_id: CategoryId::generate(),
            quantity,
            unit: "pcs".to_string(),
            buying_price: dec!(100),
            selling_price: dec!(150),
            wholesale_price: dec!(130),
            wholesale_threshold: 10,
            reorder_threshold: 3,
        }
    }

    #[test]
    fn status_is_derived_from_threshold() {
        assert_eq!(StockStatus::derive(0, 3), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(3, 3), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(4, 3), StockStatus::InStock);
    }

    #[test]
    fn register_trims_and_seeds_cost_layer() {
        let mut input = new_item("  ALT-12 ", 5);
        input.name = " Alternator 12V ".to_string();
        let item = InventoryItem::register(InventoryItemId::generate(), input, Utc::now()).unwrap();

        assert_eq!(item.code(), "ALT-12");
        assert_eq!(item.name(), "Alternator 12V");
        assert_eq!(item.quantity(), 0);
        assert_eq!(item.cost_layer_remaining(), 5);
        assert_eq!(item.status(), StockStatus::OutOfStock);
    }

    #[test]
    fn register_rejects_negative_prices() {
        let mut input = new_item("BAT-1", 0);
        input.selling_price = dec!(-1);
        let err = InventoryItem::register(InventoryItemId::generate(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("selling price")));
    }

    #[test]
    fn collision_check_ignores_case_and_whitespace() {
        let item =
            InventoryItem::register(InventoryItemId::generate(), new_item("SPK-7", 0), Utc::now())
                .unwrap();
        assert!(item.collides_with(" spk-7", "anything"));
        assert!(item.collides_with("OTHER", "spk-7 PART"));
        assert!(!item.collides_with("OTHER", "other part"));
    }

    #[test]
    fn selling_price_change_is_journaled() {
        let mut item =
            InventoryItem::register(InventoryItemId::generate(), new_item("FLT-2", 0), Utc::now())
                .unwrap();
        let patch = ItemPatch {
            selling_price: Some(dec!(175)),
            reorder_threshold: Some(0),
            ..ItemPatch::default()
        };

        let journal = item.apply_patch(&patch, Utc::now()).unwrap().unwrap();
        assert_eq!(journal.old_price, dec!(150));
        assert_eq!(journal.new_price, dec!(175));
        assert_eq!(item.selling_price(), dec!(175));
        assert_eq!(item.buying_price(), dec!(100));

        let unchanged = ItemPatch {
            selling_price: Some(dec!(175)),
            ..ItemPatch::default()
        };
        assert!(item.apply_patch(&unchanged, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn wholesale_price_applies_from_threshold() {
        let item =
            InventoryItem::register(InventoryItemId::generate(), new_item("OIL-5", 0), Utc::now())
                .unwrap();
        assert_eq!(item.sale_price_for(9), dec!(150));
        assert_eq!(item.sale_price_for(10), dec!(130));
    }
}
