//! Shared identifiers and value types used across the marketplace crates.

pub mod identity;
pub mod money;
pub mod types;

pub use identity::Identity;
pub use money::Money;
pub use types::{
    AddressId, CountryId, DeviceId, InvoiceId, ProductId, ShippingId, TransactionId, UserId,
};
