//! Engine commands and results.
//!
//! Commands are plain data carrying the business time of the request.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{GrnId, SupplierId, UserId};
use autoshop_inventory::{InventoryItemId, ItemPatch, MovementType, NewItem};
use autoshop_purchasing::{GrnLineInput, ItemReturnId, PaymentMethod, ReturnType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterItem {
    pub item: NewItem,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub item_id: InventoryItemId,
    pub patch: ItemPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Manual stock correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub item_id: InventoryItemId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub notes: Option<String>,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSupplier {
    pub name: String,
    pub contact: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGrn {
    pub supplier_id: SupplierId,
    pub lines: Vec<GrnLineInput>,
    pub discount: Decimal,
    pub received_date: NaiveDate,
    /// Generated as `GRN-NNNNNN` when absent.
    pub code: Option<String>,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedGrn {
    pub grn_id: GrnId,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordGrnPayment {
    pub grn_id: GrnId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Stock taken by an invoice or work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeForSale {
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub reference: Option<String>,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Valuation handed back to the invoicing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCost {
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    /// Wholesale-aware unit sale price.
    pub sale_price: Decimal,
}

/// Stock handed back by an invoice or work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStock {
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub reference: Option<String>,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSupplierReturn {
    pub grn_id: GrnId,
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSupplierReturn {
    pub return_id: ItemReturnId,
    pub return_type: ReturnType,
    /// Refund channel for cash returns; cash when absent.
    pub payment_method: Option<PaymentMethod>,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSupplierReturn {
    pub return_id: ItemReturnId,
    pub occurred_at: DateTime<Utc>,
}
