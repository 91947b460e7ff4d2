pub mod error;
pub mod invoice_code;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod repository;
pub mod status;

pub use error::{Result, StoreError};
pub use invoice_code::InvoiceCode;
pub use memory::{FailPoint, InMemoryStore};
pub use postgres::PostgresStore;
pub use query::{DEFAULT_LIMIT, RoleScope, TransactionQuery};
pub use records::{
    Country, Device, Invoice, Product, Transaction, TransactionShipping, User, UserAddress,
};
pub use repository::{
    CountryRepository, DeviceRepository, InvoiceRepository, ProductRepository, ShippingRepository,
    Store, TransactionRepository, UnitOfWork, UserAddressRepository, UserRepository,
};
pub use status::{InvoiceStatus, ProductStatus, TransactionStatus, UnknownStatus};
