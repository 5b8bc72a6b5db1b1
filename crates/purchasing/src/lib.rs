//! Purchasing bounded context: suppliers, goods received notes, supplier
//! payments and item returns.
//!
//! Deterministic domain logic only (no IO, no storage).

pub mod events;
pub mod grn;
pub mod payment;
pub mod returns;
pub mod supplier;

pub use events::PurchasingEvent;
pub use grn::{Grn, GrnLine, GrnLineInput, PaymentStatus, grn_code};
pub use payment::{Payment, PaymentId, PaymentMethod, PaymentPurpose};
pub use returns::{ItemReturn, ItemReturnId, ReturnStatus, ReturnType};
pub use supplier::Supplier;
