//! Item catalog operations.

use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use autoshop_accounting::{AccountType, Posting};
use autoshop_core::{DomainError, Resource, extend};
use autoshop_events::{EventBus, EventEnvelope};
use autoshop_inventory::events::{ItemRegistered, ItemUpdated};
use autoshop_inventory::{
    BuyingPriceChange, CostedItem, InventoryEvent, InventoryItem, InventoryItemId,
    SellingPriceChange, StockMovementId,
};

use super::commands::{RegisterItem, UpdateItem};
use super::{EngineResult, StockEngine, stock_moved};
use crate::store::LedgerStore;

impl<S, B> StockEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Register a catalog item. Opening stock is booked as an `In` movement
    /// and valued into both inventory accounts.
    #[instrument(skip(self, cmd), fields(code = %cmd.item.code), err)]
    pub fn register_item(&self, cmd: RegisterItem) -> EngineResult<InventoryItemId> {
        let item_id = self.execute("register_item", |uow| {
            if let Some(existing) =
                uow.store()
                    .conflicting_item(&cmd.item.code, &cmd.item.name, None)?
            {
                return Err(DomainError::duplicate_code(format!(
                    "'{}' / '{}' clashes with item {}",
                    cmd.item.code,
                    cmd.item.name,
                    existing.item().code()
                ))
                .into());
            }

            let (costed, opening) = CostedItem::register(
                InventoryItemId::generate(),
                cmd.item.clone(),
                StockMovementId::generate(),
                cmd.occurred_at,
            )?;
            let item = costed.item().clone();

            uow.emit_inventory(InventoryEvent::ItemRegistered(ItemRegistered {
                item_id: item.id(),
                code: item.code().to_string(),
                name: item.name().to_string(),
                opening_quantity: cmd.item.quantity,
                buying_price: item.buying_price(),
                occurred_at: cmd.occurred_at,
            }))?;
            if let Some(mut movement) = opening {
                movement.performed_by = cmd.performed_by;
                uow.emit_inventory(stock_moved(&movement))?;
                uow.post(Posting::inflow(AccountType::InventoryGross, movement.total_value)?);
                uow.post(Posting::inflow(
                    AccountType::InventoryNet,
                    extend(movement.quantity, item.selling_price())?,
                )?);
                uow.append_movement(movement);
            }
            uow.stage_item(costed);
            Ok(item.id())
        })?;

        info!(item_id = %item_id, "item registered");
        Ok(item_id)
    }

    /// Apply a catalog patch. Selling price changes are journaled.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id), err)]
    pub fn update_item(&self, cmd: UpdateItem) -> EngineResult<InventoryItem> {
        self.execute("update_item", |uow| {
            let mut costed = uow.load_item(cmd.item_id)?;

            if let Some(name) = &cmd.patch.name {
                let code = costed.item().code().to_string();
                if let Some(existing) = uow.store().conflicting_item(&code, name, Some(cmd.item_id))? {
                    return Err(DomainError::duplicate_code(format!(
                        "name '{name}' clashes with item {}",
                        existing.item().code()
                    ))
                    .into());
                }
            }

            let journal = costed.item_mut().apply_patch(&cmd.patch, cmd.occurred_at)?;
            uow.emit_inventory(InventoryEvent::ItemUpdated(ItemUpdated {
                item_id: cmd.item_id,
                selling_price: journal.as_ref().map(|j| j.new_price),
                occurred_at: cmd.occurred_at,
            }))?;
            if let Some(journal) = journal {
                uow.journal_selling_price(journal);
            }

            let item = costed.item().clone();
            uow.stage_item(costed);
            Ok(item)
        })
    }

    pub fn item(&self, id: InventoryItemId) -> EngineResult<InventoryItem> {
        let found = self
            .store
            .item(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Item, id))?;
        Ok(found.value.item().clone())
    }

    /// Case-insensitive code lookup.
    pub fn item_by_code(&self, code: &str) -> EngineResult<Option<InventoryItem>> {
        Ok(self
            .store
            .item_by_code(code)?
            .map(|found| found.value.item().clone()))
    }

    pub fn items(&self) -> EngineResult<Vec<InventoryItem>> {
        Ok(self
            .store
            .items()?
            .into_iter()
            .map(|costed| costed.item().clone())
            .collect())
    }

    /// Buying-price records of an item, oldest first.
    pub fn price_changes(&self, id: InventoryItemId) -> EngineResult<Vec<BuyingPriceChange>> {
        let found = self
            .store
            .item(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Item, id))?;
        Ok(found.value.price_changes().to_vec())
    }

    pub fn selling_price_history(&self, id: InventoryItemId) -> EngineResult<Vec<SellingPriceChange>> {
        Ok(self.store.selling_price_history(id)?)
    }
}
