//! Repository contracts.
//!
//! Every method is async and returns [`StoreError::NotFound`] when the
//! requested row is absent, so callers can tell absence from failure.
//!
//! [`StoreError::NotFound`]: crate::StoreError::NotFound

use async_trait::async_trait;
use common::{AddressId, CountryId, InvoiceId, ProductId, TransactionId, UserId};

use crate::{
    Country, Device, Invoice, Product, Result, Transaction, TransactionQuery, TransactionShipping,
    User, UserAddress,
};

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a new transaction, assigning its id and timestamps.
    async fn create_transaction(&self, transaction: &mut Transaction) -> Result<()>;

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction>;

    /// Returns one page of matching transactions and the unpaginated total.
    async fn list_transactions(&self, query: &TransactionQuery)
    -> Result<(Vec<Transaction>, u64)>;

    /// Persists `status`, `invoice_id`, `paid_at` and `finished_at`, and
    /// refreshes `updated_at`.
    ///
    /// Fails with `RowCountMismatch` unless exactly one row is written.
    async fn update_transaction_state(
        &self,
        id: TransactionId,
        transaction: &mut Transaction,
    ) -> Result<()>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Persists a new invoice. A second invoice for the same transaction
    /// fails with `Duplicate`.
    async fn insert_invoice(&self, invoice: &mut Invoice) -> Result<()>;

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice>;

    async fn get_invoice_by_transaction(&self, transaction_id: TransactionId) -> Result<Invoice>;

    /// Persists every mutable invoice column and refreshes `updated_at`.
    async fn update_invoice(&self, id: InvoiceId, invoice: &mut Invoice) -> Result<()>;
}

#[async_trait]
pub trait ShippingRepository: Send + Sync {
    /// Fails with `Duplicate` when the transaction already has shipping.
    async fn insert_shipping(&self, shipping: &mut TransactionShipping) -> Result<()>;

    async fn get_shipping_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionShipping>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<User>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Product>;
}

#[async_trait]
pub trait CountryRepository: Send + Sync {
    async fn get_country(&self, id: CountryId) -> Result<Country>;
}

#[async_trait]
pub trait UserAddressRepository: Send + Sync {
    async fn get_user_address(&self, id: AddressId) -> Result<UserAddress>;
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Returns the push device registered by a user.
    async fn get_device_by_user(&self, user_id: UserId) -> Result<Device>;
}

/// Writes that touch more than one table and must land together.
///
/// Either every write in a method is committed or none is; on failure the
/// passed records may already carry assigned ids but nothing is stored.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Inserts the invoice and links it from the transaction.
    async fn attach_invoice(
        &self,
        invoice: &mut Invoice,
        transaction: &mut Transaction,
    ) -> Result<()>;

    /// Persists a paid invoice together with its paid transaction.
    async fn settle_invoice(
        &self,
        invoice: &mut Invoice,
        transaction: &mut Transaction,
    ) -> Result<()>;

    /// Records shipping and persists the delivered transaction.
    ///
    /// A transaction keeps at most one shipping row; shipping it again
    /// replaces the courier and airway bill on that row.
    async fn ship_transaction(
        &self,
        shipping: &mut TransactionShipping,
        transaction: &mut Transaction,
    ) -> Result<()>;
}

/// Everything the marketplace usecases need from persistence.
pub trait Store:
    TransactionRepository
    + InvoiceRepository
    + ShippingRepository
    + UserRepository
    + ProductRepository
    + CountryRepository
    + UserAddressRepository
    + DeviceRepository
    + UnitOfWork
    + Clone
    + 'static
{
}

impl<T> Store for T where
    T: TransactionRepository
        + InvoiceRepository
        + ShippingRepository
        + UserRepository
        + ProductRepository
        + CountryRepository
        + UserAddressRepository
        + DeviceRepository
        + UnitOfWork
        + Clone
        + 'static
{
}
