//! Money arithmetic.
//!
//! Amounts are `Decimal`s in the shop currency. Every derived amount is
//! rounded to cents, midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Decimal places kept on derived amounts.
pub const MONEY_SCALE: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `quantity × unit_price`, rounded. Fails when the product does not fit a
/// `Decimal`.
pub fn extend(quantity: i64, unit_price: Decimal) -> DomainResult<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or_else(|| {
            DomainError::invalid_quantity(format!("{quantity} x {unit_price} overflows"))
        })
}

/// Checked total of `amounts`.
pub fn sum_money(amounts: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::invalid_quantity("amount total overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(107.505)), dec!(107.51));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(860) / dec!(8)), dec!(107.50));
    }

    #[test]
    fn extend_multiplies_and_rounds() {
        assert_eq!(extend(3, dec!(33.333)).unwrap(), dec!(100.00));
        assert_eq!(extend(0, dec!(12.5)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn extend_overflow_is_an_error() {
        let err = extend(i64::MAX, Decimal::MAX).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert!(extend(i64::MAX, dec!(100000000000)).is_err());
    }

    #[test]
    fn sum_money_checks_for_overflow() {
        assert_eq!(sum_money([dec!(1.25), dec!(2.75)]).unwrap(), dec!(4.00));
        assert_eq!(sum_money([]).unwrap(), Decimal::ZERO);
        assert!(sum_money([Decimal::MAX, dec!(1)]).is_err());
    }
}
