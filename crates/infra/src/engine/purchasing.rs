//! Suppliers, goods received notes and supplier payments.

use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use autoshop_accounting::{AccountType, Posting};
use autoshop_core::{DomainError, GrnId, Resource, SupplierId, extend};
use autoshop_events::{EventBus, EventEnvelope};
use autoshop_inventory::events::CostLayerDeferred;
use autoshop_inventory::{
    InventoryEvent, LayerOrigin, MovementType, NewMovement, PriceChangeId, StockMovementId,
};
use autoshop_purchasing::events::{GrnPaymentRecorded, GrnReceived, SupplierRegistered};
use autoshop_purchasing::{
    Grn, GrnLine, Payment, PaymentId, PaymentPurpose, PurchasingEvent, Supplier, grn_code,
};

use super::accounts::payment_account;
use super::commands::{ReceiveGrn, ReceivedGrn, RecordGrnPayment, RegisterSupplier};
use super::{EngineResult, StockEngine, activations, stock_moved};
use crate::store::LedgerStore;

impl<S, B> StockEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    #[instrument(skip(self, cmd), fields(name = %cmd.name), err)]
    pub fn register_supplier(&self, cmd: RegisterSupplier) -> EngineResult<SupplierId> {
        self.execute("register_supplier", |uow| {
            if uow.store().supplier_by_name(&cmd.name)?.is_some() {
                return Err(DomainError::duplicate_code(format!(
                    "supplier '{}' already exists",
                    cmd.name.trim()
                ))
                .into());
            }
            let supplier = Supplier::register(
                SupplierId::generate(),
                &cmd.name,
                cmd.contact.clone(),
                cmd.occurred_at,
            )?;
            let id = supplier.id;
            uow.emit_purchasing(PurchasingEvent::SupplierRegistered(SupplierRegistered {
                supplier_id: id,
                name: supplier.name.clone(),
                occurred_at: cmd.occurred_at,
            }))?;
            uow.stage_new_supplier(supplier);
            Ok(id)
        })
    }

    /// Receive a batch of stock from a supplier.
    ///
    /// Every line books an `In` movement and runs the cost layer intake
    /// hook. The batch commits as a whole or not at all.
    #[instrument(
        skip(self, cmd),
        fields(supplier_id = %cmd.supplier_id, lines = cmd.lines.len()),
        err
    )]
    pub fn receive_grn(&self, cmd: ReceiveGrn) -> EngineResult<ReceivedGrn> {
        Grn::validate_request(&cmd.lines, cmd.discount)?;

        let received = self.execute("receive_grn", |uow| {
            let supplier = uow.load_supplier(cmd.supplier_id)?;
            let code = self.grn_code_for(cmd.code.as_deref())?;
            let grn_id = GrnId::generate();
            let at = cmd.occurred_at;

            let mut lines = Vec::with_capacity(cmd.lines.len());
            for input in &cmd.lines {
                let mut costed = uow.load_item(input.item_id)?;
                let movement_id = StockMovementId::generate();

                let intake = costed.receive_layer(
                    PriceChangeId::generate(),
                    input.quantity,
                    input.unit_price,
                    LayerOrigin {
                        grn_id: Some(grn_id),
                        movement_id: Some(movement_id),
                    },
                    self.policy(),
                    at,
                )?;
                let request = NewMovement::new(
                    input.item_id,
                    MovementType::In,
                    input.quantity,
                    input.unit_price,
                )
                .with_grn(grn_id, supplier.id)
                .with_reference(Some(code.clone()))
                .performed_by(cmd.performed_by);
                let movement = costed.record_movement(movement_id, request, at)?;

                if !intake.superseded.is_empty() {
                    debug!(
                        item_id = %input.item_id,
                        superseded = intake.superseded.len(),
                        "pending cost layer superseded"
                    );
                }
                uow.emit_inventory(stock_moved(&movement))?;
                if intake.activated {
                    for event in activations(&costed, &[intake.record_id]) {
                        uow.emit_inventory(event)?;
                    }
                } else {
                    uow.emit_inventory(InventoryEvent::CostLayerDeferred(CostLayerDeferred {
                        item_id: input.item_id,
                        record_id: intake.record_id,
                        grn_id: Some(grn_id),
                        new_price: input.unit_price,
                        margin_qty: input.quantity,
                        occurred_at: at,
                    }))?;
                }

                lines.push(GrnLine {
                    item_id: input.item_id,
                    movement_id,
                    quantity: input.quantity,
                    unit_price: input.unit_price,
                    line_total: movement.total_value,
                    selling_value: extend(input.quantity, costed.item().selling_price())?,
                });
                uow.append_movement(movement);
                uow.stage_item(costed);
            }

            let grn = Grn::receive(
                grn_id,
                code,
                supplier.id,
                cmd.received_date,
                lines,
                cmd.discount,
                at,
            )?;

            uow.adjust_supplier_due(supplier.id, grn.sub_total_value());
            uow.post(Posting::inflow(AccountType::InventoryGross, grn.total_value())?);
            uow.post(Posting::inflow(AccountType::InventoryNet, grn.net_value())?);
            uow.post(Posting::inflow(AccountType::Payables, grn.total_value())?);
            uow.emit_purchasing(PurchasingEvent::GrnReceived(GrnReceived {
                grn_id,
                code: grn.code().to_string(),
                supplier_id: supplier.id,
                line_count: grn.lines().len(),
                total_value: grn.total_value(),
                sub_total_value: grn.sub_total_value(),
                occurred_at: at,
            }))?;

            let received = ReceivedGrn {
                grn_id,
                code: grn.code().to_string(),
            };
            uow.stage_grn(grn);
            Ok(received)
        })?;

        info!(grn_id = %received.grn_id, code = %received.code, "grn received");
        Ok(received)
    }

    /// Reads the store outside the unit of work. A code taken concurrently is
    /// caught by the commit-time uniqueness check, and the retry picks the
    /// next free one.
    fn grn_code_for(&self, requested: Option<&str>) -> EngineResult<String> {
        if let Some(code) = requested {
            let code = code.trim();
            if code.is_empty() {
                return Err(DomainError::validation("GRN code cannot be blank").into());
            }
            if self.store.grn_by_code(code)?.is_some() {
                return Err(DomainError::duplicate_code(code).into());
            }
            return Ok(code.to_string());
        }

        let mut sequence = self.store.grn_count()? + 1;
        loop {
            let candidate = grn_code(sequence);
            if self.store.grn_by_code(&candidate)?.is_none() {
                return Ok(candidate);
            }
            sequence += 1;
        }
    }

    /// Pay a supplier against a GRN.
    #[instrument(skip(self, cmd), fields(grn_id = %cmd.grn_id, amount = %cmd.amount), err)]
    pub fn record_grn_payment(&self, cmd: RecordGrnPayment) -> EngineResult<Payment> {
        self.execute("record_grn_payment", |uow| {
            let mut grn = uow.load_grn(cmd.grn_id)?;
            grn.apply_payment(cmd.amount)?;

            let payment = Payment::new(
                PaymentId::generate(),
                grn.supplier_id(),
                PaymentPurpose::GrnSettlement(grn.id()),
                cmd.method,
                cmd.amount,
                cmd.occurred_at,
            )?;

            uow.adjust_supplier_due(grn.supplier_id(), -cmd.amount);
            uow.post(Posting::outflow(AccountType::Payables, cmd.amount)?);
            uow.post(Posting::outflow(payment_account(cmd.method), cmd.amount)?);
            uow.emit_purchasing(PurchasingEvent::GrnPaymentRecorded(GrnPaymentRecorded {
                grn_id: grn.id(),
                payment_id: payment.id,
                method: cmd.method,
                amount: cmd.amount,
                due_amount: grn.due_amount(),
                occurred_at: cmd.occurred_at,
            }))?;
            uow.record_payment(payment.clone());
            uow.stage_grn(grn);
            Ok(payment)
        })
    }

    pub fn grn(&self, id: GrnId) -> EngineResult<Grn> {
        let found = self
            .store
            .grn(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Grn, id))?;
        Ok(found.value)
    }

    pub fn grn_by_code(&self, code: &str) -> EngineResult<Option<Grn>> {
        Ok(self.store.grn_by_code(code)?.map(|found| found.value))
    }

    pub fn supplier(&self, id: SupplierId) -> EngineResult<Supplier> {
        let found = self
            .store
            .supplier(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Supplier, id))?;
        Ok(found.value)
    }

    pub fn payments(&self, supplier_id: SupplierId) -> EngineResult<Vec<Payment>> {
        Ok(self.store.payments(supplier_id)?)
    }
}
