//! Supplier return workflow: issue, process, cancel.

use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use autoshop_accounting::{AccountType, Posting};
use autoshop_core::{DomainError, Page, Resource, extend};
use autoshop_events::{EventBus, EventEnvelope};
use autoshop_inventory::{MovementFilter, MovementType, NewMovement, StockMovementId};
use autoshop_purchasing::events::{ReturnCanceled, ReturnIssued, ReturnProcessed};
use autoshop_purchasing::{
    ItemReturn, ItemReturnId, Payment, PaymentId, PaymentPurpose, PurchasingEvent, ReturnType,
};

use super::accounts::payment_account;
use super::commands::{CancelSupplierReturn, IssueSupplierReturn, ProcessSupplierReturn};
use super::{EngineResult, StockEngine, stock_moved};
use crate::store::LedgerStore;

impl<S, B> StockEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Open a pending return against the receipt of `item_id` on a GRN.
    #[instrument(
        skip(self, cmd),
        fields(grn_id = %cmd.grn_id, item_id = %cmd.item_id, quantity = cmd.quantity),
        err
    )]
    pub fn issue_supplier_return(&self, cmd: IssueSupplierReturn) -> EngineResult<ItemReturnId> {
        self.execute("issue_supplier_return", |uow| {
            let grn = uow.load_grn(cmd.grn_id)?;
            let filter = MovementFilter {
                item_id: Some(cmd.item_id),
                grn_id: Some(grn.id()),
                movement_type: Some(MovementType::In),
                ..MovementFilter::default()
            };
            let receipt = uow
                .store()
                .movements(&filter, Page::first(1))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    DomainError::not_found(
                        Resource::Movement,
                        format!("receipt of item {} on grn {}", cmd.item_id, grn.code()),
                    )
                })?;

            let item_return = ItemReturn::issue(
                ItemReturnId::generate(),
                grn.id(),
                grn.supplier_id(),
                &receipt,
                cmd.quantity,
                &cmd.reason,
                cmd.occurred_at,
            )?;

            let live = uow
                .store()
                .returns_for_movement(receipt.id)?
                .into_iter()
                .any(|r| r.is_live());
            if live {
                return Err(DomainError::DuplicateReturn(receipt.id.to_string()).into());
            }

            let id = item_return.id();
            uow.emit_purchasing(PurchasingEvent::ReturnIssued(ReturnIssued {
                return_id: id,
                grn_id: grn.id(),
                item_id: cmd.item_id,
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            }))?;
            uow.stage_return(item_return);
            Ok(id)
        })
    }

    /// Settle a pending return by refund or replacement.
    #[instrument(skip(self, cmd), fields(return_id = %cmd.return_id, return_type = ?cmd.return_type), err)]
    pub fn process_supplier_return(&self, cmd: ProcessSupplierReturn) -> EngineResult<()> {
        let value = self.execute("process_supplier_return", |uow| {
            let mut item_return = uow.load_return(cmd.return_id)?;
            item_return.process(cmd.return_type, cmd.occurred_at)?;

            let mut costed = uow.load_item(item_return.item_id())?;
            let available = costed.item().quantity();
            if available < item_return.quantity() {
                return Err(DomainError::InsufficientStock {
                    requested: item_return.quantity(),
                    available,
                }
                .into());
            }

            let at = cmd.occurred_at;
            let outbound = NewMovement::new(
                item_return.item_id(),
                MovementType::Return,
                item_return.quantity(),
                item_return.unit_price(),
            )
            .with_grn(item_return.grn_id(), item_return.supplier_id())
            .with_notes(Some(item_return.reason().to_string()))
            .performed_by(cmd.performed_by);
            let returned = costed.record_movement(StockMovementId::generate(), outbound, at)?;
            uow.emit_inventory(stock_moved(&returned))?;
            uow.append_movement(returned);

            let value = item_return.value()?;
            match cmd.return_type {
                ReturnType::Cash => {
                    let effect = costed.return_layer(item_return.grn_id(), item_return.quantity());
                    debug!(return_id = %item_return.id(), ?effect, "cost layer adjusted for return");

                    let method = cmd.payment_method.unwrap_or_default();
                    let payment = Payment::new(
                        PaymentId::generate(),
                        item_return.supplier_id(),
                        PaymentPurpose::ReturnRefund(item_return.id()),
                        method,
                        value,
                        at,
                    )?;
                    uow.record_payment(payment);
                    uow.post(Posting::inflow(payment_account(method), value)?);
                    uow.post(Posting::outflow(AccountType::InventoryGross, value)?);
                    uow.post(Posting::outflow(
                        AccountType::InventoryNet,
                        extend(item_return.quantity(), costed.item().selling_price())?,
                    )?);
                }
                ReturnType::Replacement => {
                    let inbound = NewMovement::new(
                        item_return.item_id(),
                        MovementType::In,
                        item_return.quantity(),
                        item_return.unit_price(),
                    )
                    .with_grn(item_return.grn_id(), item_return.supplier_id())
                    .with_notes(Some(format!("replacement for return {}", item_return.id())))
                    .performed_by(cmd.performed_by);
                    let replaced = costed.record_movement(StockMovementId::generate(), inbound, at)?;
                    uow.emit_inventory(stock_moved(&replaced))?;
                    uow.append_movement(replaced);
                }
            }

            uow.emit_purchasing(PurchasingEvent::ReturnProcessed(ReturnProcessed {
                return_id: item_return.id(),
                return_type: cmd.return_type,
                amount: value,
                occurred_at: at,
            }))?;
            uow.stage_item(costed);
            uow.stage_return(item_return);
            Ok(value)
        })?;

        info!(return_id = %cmd.return_id, amount = %value, "supplier return processed");
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(return_id = %cmd.return_id), err)]
    pub fn cancel_supplier_return(&self, cmd: CancelSupplierReturn) -> EngineResult<()> {
        self.execute("cancel_supplier_return", |uow| {
            let mut item_return = uow.load_return(cmd.return_id)?;
            item_return.cancel(cmd.occurred_at)?;
            uow.emit_purchasing(PurchasingEvent::ReturnCanceled(ReturnCanceled {
                return_id: item_return.id(),
                occurred_at: cmd.occurred_at,
            }))?;
            uow.stage_return(item_return);
            Ok(())
        })
    }

    pub fn item_return(&self, id: ItemReturnId) -> EngineResult<ItemReturn> {
        let found = self
            .store
            .item_return(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Return, id))?;
        Ok(found.value)
    }
}
