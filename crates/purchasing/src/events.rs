use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{AggregateId, GrnId, SupplierId};
use autoshop_events::Event;
use autoshop_inventory::InventoryItemId;

use crate::payment::{PaymentId, PaymentMethod};
use crate::returns::{ItemReturnId, ReturnType};

/// Event: SupplierRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRegistered {
    pub supplier_id: SupplierId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GrnReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnReceived {
    pub grn_id: GrnId,
    pub code: String,
    pub supplier_id: SupplierId,
    pub line_count: usize,
    pub total_value: Decimal,
    pub sub_total_value: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GrnPaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnPaymentRecorded {
    pub grn_id: GrnId,
    pub payment_id: PaymentId,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub due_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnIssued {
    pub return_id: ItemReturnId,
    pub grn_id: GrnId,
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnProcessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnProcessed {
    pub return_id: ItemReturnId,
    pub return_type: ReturnType,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCanceled {
    pub return_id: ItemReturnId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchasingEvent {
    SupplierRegistered(SupplierRegistered),
    GrnReceived(GrnReceived),
    GrnPaymentRecorded(GrnPaymentRecorded),
    ReturnIssued(ReturnIssued),
    ReturnProcessed(ReturnProcessed),
    ReturnCanceled(ReturnCanceled),
}

impl PurchasingEvent {
    /// Aggregate id and type for the envelope.
    pub fn aggregate(&self) -> (AggregateId, &'static str) {
        match self {
            PurchasingEvent::SupplierRegistered(e) => (e.supplier_id.0, "purchasing.supplier"),
            PurchasingEvent::GrnReceived(e) => (e.grn_id.0, "purchasing.grn"),
            PurchasingEvent::GrnPaymentRecorded(e) => (e.grn_id.0, "purchasing.grn"),
            PurchasingEvent::ReturnIssued(e) => (e.return_id.0, "purchasing.return"),
            PurchasingEvent::ReturnProcessed(e) => (e.return_id.0, "purchasing.return"),
            PurchasingEvent::ReturnCanceled(e) => (e.return_id.0, "purchasing.return"),
        }
    }
}

impl Event for PurchasingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchasingEvent::SupplierRegistered(_) => "purchasing.supplier.registered",
            PurchasingEvent::GrnReceived(_) => "purchasing.grn.received",
            PurchasingEvent::GrnPaymentRecorded(_) => "purchasing.grn.payment_recorded",
            PurchasingEvent::ReturnIssued(_) => "purchasing.return.issued",
            PurchasingEvent::ReturnProcessed(_) => "purchasing.return.processed",
            PurchasingEvent::ReturnCanceled(_) => "purchasing.return.canceled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchasingEvent::SupplierRegistered(e) => e.occurred_at,
            PurchasingEvent::GrnReceived(e) => e.occurred_at,
            PurchasingEvent::GrnPaymentRecorded(e) => e.occurred_at,
            PurchasingEvent::ReturnIssued(e) => e.occurred_at,
            PurchasingEvent::ReturnProcessed(e) => e.occurred_at,
            PurchasingEvent::ReturnCanceled(e) => e.occurred_at,
        }
    }
}
