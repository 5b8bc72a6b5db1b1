use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult, SupplierId};

/// Supplier with the running amount the shop owes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact: Option<String>,
    pub due_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn register(
        id: SupplierId,
        name: &str,
        contact: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            contact: contact
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            due_amount: Decimal::ZERO,
            created_at: at,
        })
    }

    /// Apply a due-amount delta (positive on intake, negative on payment).
    pub fn adjust_due(&mut self, delta: Decimal) -> DomainResult<()> {
        self.due_amount = self.due_amount.checked_add(delta).ok_or_else(|| {
            DomainError::invalid_quantity(format!("due amount of supplier {} overflows", self.id))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn register_trims_and_starts_with_nothing_due() {
        let s = Supplier::register(SupplierId::generate(), "  Bosch Parts ", Some(" ".into()), Utc::now())
            .unwrap();
        assert_eq!(s.name, "Bosch Parts");
        assert_eq!(s.contact, None);
        assert_eq!(s.due_amount, Decimal::ZERO);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Supplier::register(SupplierId::generate(), "   ", None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn due_moves_by_deltas() {
        let mut s = Supplier::register(SupplierId::generate(), "Denso", None, Utc::now()).unwrap();
        s.adjust_due(dec!(950)).unwrap();
        s.adjust_due(dec!(-200)).unwrap();
        assert_eq!(s.due_amount, dec!(750));
    }

    #[test]
    fn due_overflow_leaves_amount_unchanged() {
        let mut s = Supplier::register(SupplierId::generate(), "Denso", None, Utc::now()).unwrap();
        s.adjust_due(Decimal::MAX).unwrap();
        let err = s.adjust_due(dec!(1)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert_eq!(s.due_amount, Decimal::MAX);
    }
}
