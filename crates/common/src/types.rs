use serde::{Deserialize, Serialize};

/// Declares a database-backed identifier.
///
/// Each identifier wraps the `BIGINT` primary key of its table so that a
/// buyer id can never be passed where a product id is expected.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }

            /// Returns true if the id can reference a stored row (`>= 1`).
            pub const fn is_valid(&self) -> bool {
                self.0 >= 1
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of a purchase transaction.
    TransactionId
);
row_id!(
    /// Identifier of an invoice.
    InvoiceId
);
row_id!(
    /// Identifier of a shipping record.
    ShippingId
);
row_id!(
    /// Identifier of a registered user (buyer or seller).
    UserId
);
row_id!(
    /// Identifier of a listed product.
    ProductId
);
row_id!(
    /// Identifier of a saved user address.
    AddressId
);
row_id!(
    /// Identifier of a country.
    CountryId
);
row_id!(
    /// Identifier of a registered push device.
    DeviceId
);
