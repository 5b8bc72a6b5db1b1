//! Goods Received Notes.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult, GrnId, SupplierId, extend, sum_money};
use autoshop_inventory::{InventoryItemId, StockMovementId};

/// Generated GRN code for the `sequence`-th note.
pub fn grn_code(sequence: u64) -> String {
    format!("GRN-{sequence:06}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn derive(paid: Decimal, sub_total: Decimal) -> Self {
        if paid.is_zero() {
            if sub_total.is_zero() {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            }
        } else if paid >= sub_total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }
}

/// Requested receipt line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnLineInput {
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl GrnLineInput {
    pub fn new(item_id: InventoryItemId, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            item_id,
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> DomainResult<Decimal> {
        extend(self.quantity, self.unit_price)
    }
}

/// Received line, linked to the `In` movement it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnLine {
    pub item_id: InventoryItemId,
    pub movement_id: StockMovementId,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// At cost.
    pub line_total: Decimal,
    /// At the item's selling price when received.
    pub selling_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grn {
    id: GrnId,
    code: String,
    supplier_id: SupplierId,
    received_date: NaiveDate,
    lines: Vec<GrnLine>,
    total_value: Decimal,
    net_value: Decimal,
    discount: Decimal,
    sub_total_value: Decimal,
    paid_amount: Decimal,
    due_amount: Decimal,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl Grn {
    /// Check the request shape before any item is touched. Returns the
    /// gross total at cost.
    pub fn validate_request(lines: &[GrnLineInput], discount: Decimal) -> DomainResult<Decimal> {
        if lines.is_empty() {
            return Err(DomainError::validation("a GRN needs at least one line"));
        }

        let mut seen = HashSet::with_capacity(lines.len());
        for (n, line) in lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::invalid_quantity(format!(
                    "line {}: quantity must be positive",
                    n + 1
                )));
            }
            if line.unit_price <= Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {}: unit price must be positive",
                    n + 1
                )));
            }
            if !seen.insert(line.item_id) {
                return Err(DomainError::validation(format!(
                    "line {}: item {} appears more than once",
                    n + 1,
                    line.item_id
                )));
            }
        }

        let totals = lines
            .iter()
            .map(GrnLineInput::line_total)
            .collect::<DomainResult<Vec<_>>>()?;
        let total = sum_money(totals)?;
        if discount.is_sign_negative() && !discount.is_zero() {
            return Err(DomainError::validation("discount cannot be negative"));
        }
        if discount > total {
            return Err(DomainError::validation(format!(
                "discount {discount} exceeds total value {total}"
            )));
        }
        Ok(total)
    }

    pub fn receive(
        id: GrnId,
        code: String,
        supplier_id: SupplierId,
        received_date: NaiveDate,
        lines: Vec<GrnLine>,
        discount: Decimal,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::validation("GRN code cannot be empty"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("a GRN needs at least one line"));
        }

        let total_value = sum_money(lines.iter().map(|l| l.line_total))?;
        let net_value = sum_money(lines.iter().map(|l| l.selling_value))?;
        if discount > total_value {
            return Err(DomainError::validation("discount exceeds total value"));
        }
        let sub_total_value = total_value - discount;

        Ok(Self {
            id,
            code,
            supplier_id,
            received_date,
            lines,
            total_value,
            net_value,
            discount,
            sub_total_value,
            paid_amount: Decimal::ZERO,
            due_amount: sub_total_value,
            payment_status: PaymentStatus::derive(Decimal::ZERO, sub_total_value),
            created_at: at,
        })
    }

    pub fn id(&self) -> GrnId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn received_date(&self) -> NaiveDate {
        self.received_date
    }

    pub fn lines(&self) -> &[GrnLine] {
        &self.lines
    }

    pub fn line_for(&self, item_id: InventoryItemId) -> Option<&GrnLine> {
        self.lines.iter().find(|l| l.item_id == item_id)
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    /// Received stock valued at selling prices.
    pub fn net_value(&self) -> Decimal {
        self.net_value
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn sub_total_value(&self) -> Decimal {
        self.sub_total_value
    }

    pub fn paid_amount(&self) -> Decimal {
        self.paid_amount
    }

    pub fn due_amount(&self) -> Decimal {
        self.due_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Settle part of the note. Only the payment fields ever change.
    pub fn apply_payment(&mut self, amount: Decimal) -> DomainResult<()> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if amount > self.due_amount {
            return Err(DomainError::validation(format!(
                "payment {amount} exceeds amount due {}",
                self.due_amount
            )));
        }
        self.paid_amount += amount;
        self.due_amount = self.sub_total_value - self.paid_amount;
        self.payment_status = PaymentStatus::derive(self.paid_amount, self.sub_total_value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(item_id: InventoryItemId, quantity: i64, unit_price: Decimal) -> GrnLine {
        GrnLine {
            item_id,
            movement_id: StockMovementId::generate(),
            quantity,
            unit_price,
            line_total: extend(quantity, unit_price).unwrap(),
            selling_value: extend(quantity, unit_price * dec!(1.5)).unwrap(),
        }
    }

    fn grn(discount: Decimal) -> Grn {
        Grn::receive(
            GrnId::generate(),
            grn_code(1),
            SupplierId::generate(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            vec![
                line(InventoryItemId::generate(), 4, dec!(100)),
                line(InventoryItemId::generate(), 2, dec!(300)),
            ],
            discount,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn generated_codes_are_zero_padded() {
        assert_eq!(grn_code(42), "GRN-000042");
    }

    #[test]
    fn discount_reduces_sub_total_and_due() {
        let g = grn(dec!(50));
        assert_eq!(g.total_value(), dec!(1000));
        assert_eq!(g.net_value(), dec!(1500));
        assert_eq!(g.sub_total_value(), dec!(950));
        assert_eq!(g.due_amount(), dec!(950));
        assert_eq!(g.payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn payments_move_status_to_paid() {
        let mut g = grn(Decimal::ZERO);
        g.apply_payment(dec!(400)).unwrap();
        assert_eq!(g.payment_status(), PaymentStatus::Partial);
        assert_eq!(g.due_amount(), dec!(600));

        let err = g.apply_payment(dec!(600.01)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        g.apply_payment(dec!(600)).unwrap();
        assert_eq!(g.payment_status(), PaymentStatus::Paid);
        assert_eq!(g.due_amount(), Decimal::ZERO);
    }

    #[test]
    fn request_validation() {
        let item = InventoryItemId::generate();
        let ok = [GrnLineInput::new(item, 2, dec!(10.005))];
        assert_eq!(Grn::validate_request(&ok, dec!(0)).unwrap(), dec!(20.01));

        assert!(Grn::validate_request(&[], dec!(0)).is_err());
        assert!(matches!(
            Grn::validate_request(&[GrnLineInput::new(item, 0, dec!(1))], dec!(0)),
            Err(DomainError::InvalidQuantity(_))
        ));
        assert!(Grn::validate_request(&[GrnLineInput::new(item, 1, dec!(0))], dec!(0)).is_err());
        assert!(
            Grn::validate_request(
                &[GrnLineInput::new(item, 1, dec!(5)), GrnLineInput::new(item, 1, dec!(6))],
                dec!(0)
            )
            .is_err()
        );
        assert!(Grn::validate_request(&ok, dec!(-1)).is_err());
        assert!(Grn::validate_request(&ok, dec!(20.02)).is_err());
    }

    #[test]
    fn oversized_lines_are_rejected() {
        let item = InventoryItemId::generate();
        let err = Grn::validate_request(
            &[GrnLineInput::new(item, i64::MAX, dec!(100000000000))],
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));

        let lines = [
            GrnLineInput::new(item, i64::MAX, dec!(5000000000)),
            GrnLineInput::new(InventoryItemId::generate(), i64::MAX, dec!(5000000000)),
        ];
        assert!(lines[0].line_total().is_ok());
        let err = Grn::validate_request(&lines, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
    }

    #[test]
    fn zero_subtotal_is_paid() {
        assert_eq!(PaymentStatus::derive(Decimal::ZERO, Decimal::ZERO), PaymentStatus::Paid);
    }

    proptest! {
        #[test]
        fn payments_never_exceed_sub_total(amounts in proptest::collection::vec(1i64..60_000, 1..20)) {
            let mut g = grn(dec!(50));
            for cents in amounts {
                let _ = g.apply_payment(Decimal::new(cents, 2));
                prop_assert!(g.paid_amount() <= g.sub_total_value());
                prop_assert_eq!(g.paid_amount() + g.due_amount(), g.sub_total_value());
                prop_assert_eq!(
                    g.payment_status(),
                    PaymentStatus::derive(g.paid_amount(), g.sub_total_value())
                );
            }
        }
    }
}
