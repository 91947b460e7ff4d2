use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{
    AddressId, CountryId, DeviceId, InvoiceId, Money, ProductId, ShippingId, TransactionId, UserId,
};
use tokio::sync::RwLock;

use crate::{
    Country, CountryRepository, Device, DeviceRepository, Invoice, InvoiceRepository, Product,
    ProductRepository, ProductStatus, Result, ShippingRepository, StoreError, Transaction,
    TransactionQuery, TransactionRepository, TransactionShipping, UnitOfWork, User, UserAddress,
    UserAddressRepository, UserRepository,
};

/// A write or read that can be made to fail on the in-memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateTransaction,
    GetTransaction,
    ListTransactions,
    UpdateTransactionState,
    InsertInvoice,
    GetInvoice,
    UpdateInvoice,
    InsertShipping,
    GetShipping,
    GetUser,
    GetProduct,
    GetCountry,
    GetUserAddress,
    GetDevice,
}

#[derive(Default)]
struct Tables {
    transactions: BTreeMap<TransactionId, Transaction>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    shippings: BTreeMap<ShippingId, TransactionShipping>,
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    countries: BTreeMap<CountryId, Country>,
    addresses: BTreeMap<AddressId, UserAddress>,
    devices: BTreeMap<DeviceId, Device>,
    sequence: i64,
    failures: HashSet<FailPoint>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.failures.contains(&point) {
            return Err(StoreError::Unavailable(format!("{point:?} failure injected")));
        }
        Ok(())
    }

    fn check_invoice_insert(&self, invoice: &Invoice) -> Result<()> {
        self.check(FailPoint::InsertInvoice)?;
        if self
            .invoices
            .values()
            .any(|existing| existing.transaction_id == invoice.transaction_id)
        {
            return Err(StoreError::Duplicate {
                entity: "invoice",
                key: invoice.transaction_id.as_i64(),
            });
        }
        Ok(())
    }

    fn check_shipping_insert(&self, shipping: &TransactionShipping) -> Result<()> {
        self.check(FailPoint::InsertShipping)?;
        if self.shipping_for(shipping.transaction_id).is_some() {
            return Err(StoreError::Duplicate {
                entity: "transaction_shipping",
                key: shipping.transaction_id.as_i64(),
            });
        }
        Ok(())
    }

    fn shipping_for(&self, transaction_id: TransactionId) -> Option<ShippingId> {
        self.shippings
            .values()
            .find(|shipping| shipping.transaction_id == transaction_id)
            .map(|shipping| shipping.id)
    }

    fn check_transaction_update(&self, id: TransactionId) -> Result<()> {
        self.check(FailPoint::UpdateTransactionState)?;
        if !self.transactions.contains_key(&id) {
            return Err(StoreError::RowCountMismatch {
                entity: "transaction",
                id: id.as_i64(),
                affected: 0,
            });
        }
        Ok(())
    }

    fn check_invoice_update(&self, id: InvoiceId) -> Result<()> {
        self.check(FailPoint::UpdateInvoice)?;
        if !self.invoices.contains_key(&id) {
            return Err(StoreError::RowCountMismatch {
                entity: "invoice",
                id: id.as_i64(),
                affected: 0,
            });
        }
        Ok(())
    }

    fn apply_invoice_insert(&mut self, invoice: &mut Invoice) {
        let now = Utc::now();
        invoice.id = InvoiceId::new(self.next_id());
        invoice.created_at = now;
        invoice.updated_at = now;
        self.invoices.insert(invoice.id, invoice.clone());
    }

    fn apply_transaction_update(&mut self, id: TransactionId, transaction: &mut Transaction) {
        transaction.updated_at = Utc::now();
        if let Some(row) = self.transactions.get_mut(&id) {
            row.status = transaction.status;
            row.invoice_id = transaction.invoice_id;
            row.paid_at = transaction.paid_at;
            row.finished_at = transaction.finished_at;
            row.updated_at = transaction.updated_at;
        }
    }

    fn apply_invoice_update(&mut self, id: InvoiceId, invoice: &mut Invoice) {
        invoice.updated_at = Utc::now();
        if let Some(row) = self.invoices.get_mut(&id) {
            row.status = invoice.status;
            row.paid_at = invoice.paid_at;
            row.receipt_proof = invoice.receipt_proof.clone();
            row.payment_method = invoice.payment_method.clone();
            row.updated_at = invoice.updated_at;
        }
    }

    fn apply_shipping_insert(&mut self, shipping: &mut TransactionShipping) {
        let now = Utc::now();
        shipping.id = ShippingId::new(self.next_id());
        shipping.created_at = now;
        shipping.updated_at = now;
        self.shippings.insert(shipping.id, shipping.clone());
    }

    fn apply_shipping_upsert(&mut self, shipping: &mut TransactionShipping) {
        let Some(existing) = self.shipping_for(shipping.transaction_id) else {
            self.apply_shipping_insert(shipping);
            return;
        };

        if let Some(row) = self.shippings.get_mut(&existing) {
            row.awb_number = shipping.awb_number.clone();
            row.courier = shipping.courier.clone();
            row.updated_at = Utc::now();
            shipping.id = row.id;
            shipping.created_at = row.created_at;
            shipping.updated_at = row.updated_at;
        }
    }
}

/// In-memory store for tests and for running the server without a database.
///
/// All tables sit behind one lock, so each unit-of-work method validates
/// every write before applying any of them.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call guarded by `point` fail until cleared.
    pub async fn set_failure(&self, point: FailPoint, fail: bool) {
        let mut tables = self.tables.write().await;
        if fail {
            tables.failures.insert(point);
        } else {
            tables.failures.remove(&point);
        }
    }

    pub async fn transaction_count(&self) -> usize {
        self.tables.read().await.transactions.len()
    }

    pub async fn invoice_count(&self) -> usize {
        self.tables.read().await.invoices.len()
    }

    pub async fn shipping_count(&self) -> usize {
        self.tables.read().await.shippings.len()
    }

    pub async fn seed_user(&self, name: &str) -> User {
        let mut tables = self.tables.write().await;
        let id = UserId::new(tables.next_id());
        let user = User {
            id,
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            phone: "081234567890".to_string(),
            bank_name: "BCA".to_string(),
            bank_account: format!("000{id}"),
            avatar: String::new(),
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        user
    }

    pub async fn seed_country(&self, name: &str) -> Country {
        let mut tables = self.tables.write().await;
        let id = CountryId::new(tables.next_id());
        let country = Country {
            id,
            name: name.to_string(),
            image: format!("{}.png", name.to_lowercase()),
        };
        tables.countries.insert(id, country.clone());
        country
    }

    pub async fn seed_product(
        &self,
        seller_id: UserId,
        country_id: CountryId,
        title: &str,
        price: Money,
    ) -> Product {
        let mut tables = self.tables.write().await;
        let id = ProductId::new(tables.next_id());
        let now = Utc::now();
        let today = now.date_naive();
        let product = Product {
            id,
            title: title.to_string(),
            description: format!("{title} description"),
            price,
            seller_id,
            country_id,
            image: String::new(),
            status: ProductStatus::Offered,
            from_date: today,
            to_date: today
                .checked_add_days(chrono::Days::new(30))
                .unwrap_or(NaiveDate::MAX),
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(id, product.clone());
        product
    }

    /// Reprices a seeded product.
    pub async fn set_product_price(&self, id: ProductId, price: Money) {
        let mut tables = self.tables.write().await;
        if let Some(product) = tables.products.get_mut(&id) {
            product.price = price;
            product.updated_at = Utc::now();
        }
    }

    pub async fn seed_address(&self, user_id: UserId) -> UserAddress {
        let mut tables = self.tables.write().await;
        let id = AddressId::new(tables.next_id());
        let now = Utc::now();
        let address = UserAddress {
            id,
            user_id,
            address: "Jl. Merdeka No. 1".to_string(),
            phone: "081234567890".to_string(),
            address_name: "Rumah".to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.addresses.insert(id, address.clone());
        address
    }

    pub async fn seed_device(&self, user_id: UserId, device_token: &str) -> Device {
        let mut tables = self.tables.write().await;
        let id = DeviceId::new(tables.next_id());
        let device = Device {
            id,
            device_token: device_token.to_string(),
            platform: "android".to_string(),
            user_id,
        };
        tables.devices.insert(id, device.clone());
        device
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn create_transaction(&self, transaction: &mut Transaction) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::CreateTransaction)?;

        let now = Utc::now();
        transaction.id = TransactionId::new(tables.next_id());
        transaction.created_at = now;
        transaction.updated_at = now;
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetTransaction)?;
        tables
            .transactions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "transaction",
                id: id.as_i64(),
            })
    }

    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<(Vec<Transaction>, u64)> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::ListTransactions)?;

        let mut matching: Vec<_> = tables
            .transactions
            .values()
            .filter(|tx| query.matches(tx))
            .cloned()
            .collect();
        let total = matching.len() as u64;

        // Newest first; ids break ties between rows written in the same instant
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        let page = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn update_transaction_state(
        &self,
        id: TransactionId,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_transaction_update(id)?;
        tables.apply_transaction_update(id, transaction);
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryStore {
    async fn insert_invoice(&self, invoice: &mut Invoice) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_invoice_insert(invoice)?;
        tables.apply_invoice_insert(invoice);
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetInvoice)?;
        tables
            .invoices
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "invoice",
                id: id.as_i64(),
            })
    }

    async fn get_invoice_by_transaction(&self, transaction_id: TransactionId) -> Result<Invoice> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetInvoice)?;
        tables
            .invoices
            .values()
            .find(|invoice| invoice.transaction_id == transaction_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "invoice",
                id: transaction_id.as_i64(),
            })
    }

    async fn update_invoice(&self, id: InvoiceId, invoice: &mut Invoice) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_invoice_update(id)?;
        tables.apply_invoice_update(id, invoice);
        Ok(())
    }
}

#[async_trait]
impl ShippingRepository for InMemoryStore {
    async fn insert_shipping(&self, shipping: &mut TransactionShipping) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_shipping_insert(shipping)?;
        tables.apply_shipping_insert(shipping);
        Ok(())
    }

    async fn get_shipping_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionShipping> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetShipping)?;
        tables
            .shippings
            .values()
            .find(|shipping| shipping.transaction_id == transaction_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "transaction_shipping",
                id: transaction_id.as_i64(),
            })
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: UserId) -> Result<User> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetUser)?;
        tables.users.get(&id).cloned().ok_or(StoreError::NotFound {
            entity: "user",
            id: id.as_i64(),
        })
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetProduct)?;
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "product",
                id: id.as_i64(),
            })
    }
}

#[async_trait]
impl CountryRepository for InMemoryStore {
    async fn get_country(&self, id: CountryId) -> Result<Country> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetCountry)?;
        tables
            .countries
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "country",
                id: id.as_i64(),
            })
    }
}

#[async_trait]
impl UserAddressRepository for InMemoryStore {
    async fn get_user_address(&self, id: AddressId) -> Result<UserAddress> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetUserAddress)?;
        tables
            .addresses
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "user_address",
                id: id.as_i64(),
            })
    }
}

#[async_trait]
impl DeviceRepository for InMemoryStore {
    async fn get_device_by_user(&self, user_id: UserId) -> Result<Device> {
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetDevice)?;
        tables
            .devices
            .values()
            .rev()
            .find(|device| device.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "user_device",
                id: user_id.as_i64(),
            })
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn attach_invoice(
        &self,
        invoice: &mut Invoice,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_invoice_insert(invoice)?;
        tables.check_transaction_update(transaction.id)?;

        tables.apply_invoice_insert(invoice);
        transaction.invoice_id = Some(invoice.id);
        let id = transaction.id;
        tables.apply_transaction_update(id, transaction);
        Ok(())
    }

    async fn settle_invoice(
        &self,
        invoice: &mut Invoice,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_invoice_update(invoice.id)?;
        tables.check_transaction_update(transaction.id)?;

        let invoice_id = invoice.id;
        tables.apply_invoice_update(invoice_id, invoice);
        let transaction_id = transaction.id;
        tables.apply_transaction_update(transaction_id, transaction);
        Ok(())
    }

    async fn ship_transaction(
        &self,
        shipping: &mut TransactionShipping,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::InsertShipping)?;
        tables.check_transaction_update(transaction.id)?;

        tables.apply_shipping_upsert(shipping);
        let id = transaction.id;
        tables.apply_transaction_update(id, transaction);
        Ok(())
    }
}
