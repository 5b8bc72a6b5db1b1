//! Consumption, release, manual adjustment and ledger queries.

use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

use autoshop_accounting::{AccountType, Posting};
use autoshop_core::{DomainError, Page, Resource, UserId, extend};
use autoshop_events::{EventBus, EventEnvelope};
use autoshop_inventory::{
    Consumption, CostedItem, InventoryItemId, MovementFilter, MovementType, NewMovement,
    StockMovement, StockMovementId, StockReconciliation, ledger_sum,
};
use chrono::{DateTime, Utc};

use super::commands::{AdjustStock, ConsumeForSale, ReleaseStock, SaleCost};
use super::{EngineResult, StockEngine, activations, stock_moved};
use crate::store::LedgerStore;
use crate::unit_of_work::UnitOfWork;

/// Origin details stamped on an engine-written movement.
struct Stamp<'a> {
    reference: Option<&'a String>,
    notes: Option<&'a String>,
    performed_by: Option<UserId>,
    at: DateTime<Utc>,
}

impl Stamp<'_> {
    fn apply(&self, movement: NewMovement) -> NewMovement {
        movement
            .with_reference(self.reference.cloned())
            .with_notes(self.notes.cloned())
            .performed_by(self.performed_by)
    }
}

impl<S, B> StockEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Take stock for an invoice or work order, valued through the cost
    /// layers.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id, quantity = cmd.quantity), err)]
    pub fn consume_for_sale(&self, cmd: ConsumeForSale) -> EngineResult<SaleCost> {
        self.execute("consume_for_sale", |uow| {
            let stamp = Stamp {
                reference: cmd.reference.as_ref(),
                notes: None,
                performed_by: cmd.performed_by,
                at: cmd.occurred_at,
            };
            let (consumption, sale_price) = self.stock_out(uow, cmd.item_id, cmd.quantity, &stamp)?;
            Ok(SaleCost {
                unit_cost: consumption.cost.unit_cost,
                total_cost: consumption.cost.total_cost,
                sale_price,
            })
        })
    }

    /// Return previously consumed stock at the current buying price. Cost
    /// layers are left as they are.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id, quantity = cmd.quantity), err)]
    pub fn release_stock(&self, cmd: ReleaseStock) -> EngineResult<()> {
        self.execute("release_stock", |uow| {
            let stamp = Stamp {
                reference: cmd.reference.as_ref(),
                notes: None,
                performed_by: cmd.performed_by,
                at: cmd.occurred_at,
            };
            let mut costed = uow.load_item(cmd.item_id)?;
            stock_in(uow, &mut costed, cmd.quantity, &stamp)?;
            uow.stage_item(costed);
            Ok(())
        })
    }

    /// Manual correction. `In` joins the active cost layer; `Out` is valued
    /// like a sale.
    #[instrument(
        skip(self, cmd),
        fields(item_id = %cmd.item_id, movement_type = %cmd.movement_type, quantity = cmd.quantity),
        err
    )]
    pub fn adjust_stock(&self, cmd: AdjustStock) -> EngineResult<StockMovement> {
        if cmd.movement_type == MovementType::Return {
            return Err(DomainError::InvalidMovementType(
                "returns go through the supplier return workflow".to_string(),
            )
            .into());
        }

        self.execute("adjust_stock", |uow| {
            let stamp = Stamp {
                reference: None,
                notes: cmd.notes.as_ref(),
                performed_by: cmd.performed_by,
                at: cmd.occurred_at,
            };
            match cmd.movement_type {
                MovementType::In => {
                    let mut costed = uow.load_item(cmd.item_id)?;
                    let movement = stock_in(uow, &mut costed, cmd.quantity, &stamp)?;
                    costed.extend_active_layer(cmd.quantity);
                    uow.stage_item(costed);
                    Ok(movement)
                }
                MovementType::Out | MovementType::Return => {
                    let (consumption, _) = self.stock_out(uow, cmd.item_id, cmd.quantity, &stamp)?;
                    Ok(consumption.movement)
                }
            }
        })
    }

    fn stock_out(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        item_id: InventoryItemId,
        quantity: i64,
        stamp: &Stamp<'_>,
    ) -> EngineResult<(Consumption, rust_decimal::Decimal)> {
        let mut costed = uow.load_item(item_id)?;
        let sale_price = costed.item().sale_price_for(quantity);
        let consumption = costed.consume(
            StockMovementId::generate(),
            quantity,
            self.policy(),
            |m| stamp.apply(m),
            stamp.at,
        )?;

        if consumption.cost.depleted_without_pending {
            warn!(
                item_id = %item_id,
                quantity,
                buying_price = %costed.item().buying_price(),
                "cost layer depleted with no pending price; costed at current price"
            );
        }

        if !consumption.cost.activated.is_empty() {
            debug!(
                item_id = %item_id,
                activated = consumption.cost.activated.len(),
                unit_cost = %consumption.cost.unit_cost,
                "pending cost layer activated by consumption"
            );
        }
        uow.emit_inventory(stock_moved(&consumption.movement))?;
        for event in activations(&costed, &consumption.cost.activated) {
            uow.emit_inventory(event)?;
        }
        uow.post(Posting::outflow(
            AccountType::InventoryGross,
            consumption.cost.total_cost,
        )?);
        uow.post(Posting::outflow(
            AccountType::InventoryNet,
            extend(quantity, costed.item().selling_price())?,
        )?);
        uow.append_movement(consumption.movement.clone());
        uow.stage_item(costed);
        Ok((consumption, sale_price))
    }

    /// Ledger entries matching `filter`, oldest first. Uses the configured
    /// page size when `page` is absent.
    pub fn movements(
        &self,
        filter: &MovementFilter,
        page: Option<Page>,
    ) -> EngineResult<Vec<StockMovement>> {
        let page = page.unwrap_or_else(|| Page::first(self.config.default_page_size));
        Ok(self.store.movements(filter, page)?)
    }

    pub fn movement(&self, id: StockMovementId) -> EngineResult<StockMovement> {
        Ok(self
            .store
            .movement(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Movement, id))?)
    }

    /// Compare the stored quantity with the signed sum of the item's ledger.
    pub fn reconcile(&self, item_id: InventoryItemId) -> EngineResult<StockReconciliation> {
        let found = self
            .store
            .item(item_id)?
            .ok_or_else(|| DomainError::not_found(Resource::Item, item_id))?;
        let ledger = self
            .store
            .movements(&MovementFilter::for_item(item_id), Page::new(0, usize::MAX))?;

        let reconciliation = StockReconciliation {
            item_id,
            quantity: found.value.item().quantity(),
            ledger_quantity: ledger_sum(&ledger),
            movement_count: ledger.len(),
        };
        if !reconciliation.is_consistent() {
            warn!(item_id = %item_id, drift = reconciliation.drift(), "stock ledger drift");
        }
        Ok(reconciliation)
    }
}

/// `In` movement at the current buying price, valued into both inventory
/// accounts.
fn stock_in<S>(
    uow: &mut UnitOfWork<'_, S>,
    costed: &mut CostedItem,
    quantity: i64,
    stamp: &Stamp<'_>,
) -> EngineResult<StockMovement>
where
    S: LedgerStore + ?Sized,
{
    let request = stamp.apply(NewMovement::new(
        costed.item().id(),
        MovementType::In,
        quantity,
        costed.item().buying_price(),
    ));
    let movement = costed.record_movement(StockMovementId::generate(), request, stamp.at)?;

    uow.emit_inventory(stock_moved(&movement))?;
    uow.post(Posting::inflow(AccountType::InventoryGross, movement.total_value)?);
    uow.post(Posting::inflow(
        AccountType::InventoryNet,
        extend(quantity, costed.item().selling_price())?,
    )?);
    uow.append_movement(movement.clone());
    Ok(movement)
}
