//! Accounting module: running balances per shop account.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod balance;

pub use balance::{AccountBalance, AccountBalances, AccountType, Direction, Posting};
