use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoshop_core::{DomainError, DomainResult};

/// Shop account. Each has exactly one running balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Stock valued at cost.
    InventoryGross,
    /// Stock valued at selling price.
    InventoryNet,
    Cash,
    Bank,
    Receivables,
    Payables,
    CreditCard,
}

impl AccountType {
    pub const ALL: [AccountType; 7] = [
        AccountType::InventoryGross,
        AccountType::InventoryNet,
        AccountType::Cash,
        AccountType::Bank,
        AccountType::Receivables,
        AccountType::Payables,
        AccountType::CreditCard,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// A single balance movement. Amounts are never negative; the direction
/// carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account: AccountType,
    pub direction: Direction,
    pub amount: Decimal,
}

impl Posting {
    pub fn new(account: AccountType, direction: Direction, amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "posting amount cannot be negative: {amount}"
            )));
        }
        Ok(Self {
            account,
            direction,
            amount,
        })
    }

    pub fn inflow(account: AccountType, amount: Decimal) -> DomainResult<Self> {
        Self::new(account, Direction::In, amount)
    }

    pub fn outflow(account: AccountType, amount: Decimal) -> DomainResult<Self> {
        Self::new(account, Direction::Out, amount)
    }

    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::In => self.amount,
            Direction::Out => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_type: AccountType,
    pub current_balance: Decimal,
    pub currency: String,
}

/// All account balances. Every account exists from the start at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalances {
    currency: String,
    balances: BTreeMap<AccountType, Decimal>,
}

impl AccountBalances {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            balances: AccountType::ALL
                .into_iter()
                .map(|a| (a, Decimal::ZERO))
                .collect(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Balances may go negative. A posting that would overflow the balance is
    /// rejected and leaves it untouched.
    pub fn post(&mut self, posting: &Posting) -> DomainResult<()> {
        let balance = self.balances.entry(posting.account).or_insert(Decimal::ZERO);
        *balance = balance.checked_add(posting.signed_amount()).ok_or_else(|| {
            DomainError::invalid_quantity(format!("{:?} balance overflows", posting.account))
        })?;
        Ok(())
    }

    pub fn balance(&self, account: AccountType) -> Decimal {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Every account, in declaration order.
    pub fn snapshot(&self) -> Vec<AccountBalance> {
        AccountType::ALL
            .into_iter()
            .map(|account_type| AccountBalance {
                account_type,
                current_balance: self.balance(account_type),
                currency: self.currency.clone(),
            })
            .collect()
    }
}
