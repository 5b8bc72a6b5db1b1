use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult, GrnId, SupplierId};

use crate::returns::ItemReturnId;

autoshop_core::domain_id!(
    /// Supplier payment identifier.
    PaymentId
);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Bank,
    CreditCard,
}

/// What a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PaymentPurpose {
    /// Shop pays the supplier against a GRN.
    GrnSettlement(GrnId),
    /// Supplier refunds the shop for returned goods.
    ReturnRefund(ItemReturnId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub supplier_id: SupplierId,
    pub purpose: PaymentPurpose,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        id: PaymentId,
        supplier_id: SupplierId,
        purpose: PaymentPurpose,
        method: PaymentMethod,
        amount: Decimal,
        paid_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        Ok(Self {
            id,
            supplier_id,
            purpose,
            method,
            amount,
            paid_at,
        })
    }
}
