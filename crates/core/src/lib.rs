//! `autoshop-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;
pub mod page;
pub mod version;

pub use error::{DomainError, DomainResult, ErrorKind, Resource};
pub use id::{AggregateId, GrnId, SupplierId, UserId};
pub use money::{MONEY_SCALE, extend, round_money, sum_money};
pub use page::Page;
pub use version::{ExpectedVersion, Versioned};
