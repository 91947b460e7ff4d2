use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use common::{
    AddressId, CountryId, DeviceId, InvoiceId, Money, ProductId, ShippingId, TransactionId, UserId,
};
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};

use crate::{
    Country, CountryRepository, Device, DeviceRepository, Invoice, InvoiceCode, InvoiceRepository,
    InvoiceStatus, Product, ProductRepository, ProductStatus, Result, RoleScope,
    ShippingRepository, StoreError, Transaction, TransactionQuery, TransactionRepository,
    TransactionShipping, TransactionStatus, UnitOfWork, User, UserAddress, UserAddressRepository,
    UserRepository,
};

const TRANSACTION_COLUMNS: &str = "id, product_id, buyer_id, seller_id, buyer_address_id, \
     quantity, notes, total_price, status, invoice_id, paid_at, finished_at, created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, transaction_id, invoice_code, coded_price, payment_method, \
     status, paid_at, receipt_proof, created_at, updated_at";

/// Timestamps are stored with microsecond precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn row_to_transaction(row: PgRow) -> Result<Transaction> {
        let status: i16 = row.try_get("status")?;
        let quantity: i64 = row.try_get("quantity")?;

        Ok(Transaction {
            id: TransactionId::new(row.try_get("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            buyer_id: UserId::new(row.try_get("buyer_id")?),
            seller_id: UserId::new(row.try_get("seller_id")?),
            buyer_address_id: AddressId::new(row.try_get("buyer_address_id")?),
            quantity: u32::try_from(quantity).map_err(|_| StoreError::InvalidColumn {
                column: "transactions.quantity",
                value: quantity,
            })?,
            notes: row.try_get("notes")?,
            total_price: Money::new(row.try_get("total_price")?),
            status: TransactionStatus::from_code(status).ok_or(StoreError::InvalidColumn {
                column: "transactions.status",
                value: i64::from(status),
            })?,
            invoice_id: row
                .try_get::<Option<i64>, _>("invoice_id")?
                .map(InvoiceId::new),
            paid_at: row.try_get("paid_at")?,
            finished_at: row.try_get("finished_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_invoice(row: PgRow) -> Result<Invoice> {
        let status: i16 = row.try_get("status")?;

        Ok(Invoice {
            id: InvoiceId::new(row.try_get("id")?),
            transaction_id: TransactionId::new(row.try_get("transaction_id")?),
            invoice_code: InvoiceCode::from_stored(row.try_get::<String, _>("invoice_code")?),
            coded_price: Money::new(row.try_get("coded_price")?),
            payment_method: row.try_get("payment_method")?,
            status: InvoiceStatus::from_code(status).ok_or(StoreError::InvalidColumn {
                column: "invoices.status",
                value: i64::from(status),
            })?,
            paid_at: row.try_get("paid_at")?,
            receipt_proof: row.try_get("receipt_proof")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_shipping(row: PgRow) -> Result<TransactionShipping> {
        Ok(TransactionShipping {
            id: ShippingId::new(row.try_get("id")?),
            transaction_id: TransactionId::new(row.try_get("transaction_id")?),
            awb_number: row.try_get("awb_number")?,
            courier: row.try_get("courier")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn insert_invoice_with<'e, E: PgExecutor<'e>>(
        executor: E,
        invoice: &mut Invoice,
    ) -> Result<()> {
        let now = now();
        let transaction_id = invoice.transaction_id;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (transaction_id, invoice_code, coded_price, payment_method, status, paid_at, receipt_proof, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id
            "#,
        )
        .bind(transaction_id.as_i64())
        .bind(invoice.invoice_code.as_str())
        .bind(invoice.coded_price.amount())
        .bind(&invoice.payment_method)
        .bind(invoice.status.code())
        .bind(invoice.paid_at)
        .bind(&invoice.receipt_proof)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_invoice_transaction")
            {
                return StoreError::Duplicate {
                    entity: "invoice",
                    key: transaction_id.as_i64(),
                };
            }
            StoreError::Database(e)
        })?;

        invoice.id = InvoiceId::new(id);
        invoice.created_at = now;
        invoice.updated_at = now;
        Ok(())
    }

    async fn update_invoice_with<'e, E: PgExecutor<'e>>(
        executor: E,
        id: InvoiceId,
        invoice: &mut Invoice,
    ) -> Result<()> {
        let now = now();
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET payment_method = $1, status = $2, paid_at = $3, receipt_proof = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&invoice.payment_method)
        .bind(invoice.status.code())
        .bind(invoice.paid_at)
        .bind(&invoice.receipt_proof)
        .bind(now)
        .bind(id.as_i64())
        .execute(executor)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::RowCountMismatch {
                entity: "invoice",
                id: id.as_i64(),
                affected: result.rows_affected(),
            });
        }

        invoice.updated_at = now;
        Ok(())
    }

    async fn update_transaction_state_with<'e, E: PgExecutor<'e>>(
        executor: E,
        id: TransactionId,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let now = now();
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, invoice_id = $2, paid_at = $3, finished_at = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(transaction.status.code())
        .bind(transaction.invoice_id.map(|id| id.as_i64()))
        .bind(transaction.paid_at)
        .bind(transaction.finished_at)
        .bind(now)
        .bind(id.as_i64())
        .execute(executor)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::RowCountMismatch {
                entity: "transaction",
                id: id.as_i64(),
                affected: result.rows_affected(),
            });
        }

        transaction.updated_at = now;
        Ok(())
    }

    async fn insert_shipping_with<'e, E: PgExecutor<'e>>(
        executor: E,
        shipping: &mut TransactionShipping,
    ) -> Result<()> {
        let now = now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transaction_shippings (transaction_id, awb_number, courier, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id
            "#,
        )
        .bind(shipping.transaction_id.as_i64())
        .bind(&shipping.awb_number)
        .bind(&shipping.courier)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_shipping_transaction")
            {
                return StoreError::Duplicate {
                    entity: "transaction_shipping",
                    key: shipping.transaction_id.as_i64(),
                };
            }
            StoreError::Database(e)
        })?;

        shipping.id = ShippingId::new(id);
        shipping.created_at = now;
        shipping.updated_at = now;
        Ok(())
    }

    /// Writes the transaction's only shipping row, replacing the tracking
    /// details when one already exists.
    async fn upsert_shipping_with<'e, E: PgExecutor<'e>>(
        executor: E,
        shipping: &mut TransactionShipping,
    ) -> Result<()> {
        let now = now();
        let row = sqlx::query(
            r#"
            INSERT INTO transaction_shippings (transaction_id, awb_number, courier, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (transaction_id) DO UPDATE
            SET awb_number = EXCLUDED.awb_number,
                courier = EXCLUDED.courier,
                updated_at = EXCLUDED.updated_at
            RETURNING id, created_at
            "#,
        )
        .bind(shipping.transaction_id.as_i64())
        .bind(&shipping.awb_number)
        .bind(&shipping.courier)
        .bind(now)
        .fetch_one(executor)
        .await?;

        shipping.id = ShippingId::new(row.try_get("id")?);
        shipping.created_at = row.try_get("created_at")?;
        shipping.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for PostgresStore {
    async fn create_transaction(&self, transaction: &mut Transaction) -> Result<()> {
        let now = now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (product_id, buyer_id, seller_id, buyer_address_id, quantity, notes, total_price, status, invoice_id, paid_at, finished_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING id
            "#,
        )
        .bind(transaction.product_id.as_i64())
        .bind(transaction.buyer_id.as_i64())
        .bind(transaction.seller_id.as_i64())
        .bind(transaction.buyer_address_id.as_i64())
        .bind(i64::from(transaction.quantity))
        .bind(&transaction.notes)
        .bind(transaction.total_price.amount())
        .bind(transaction.status.code())
        .bind(transaction.invoice_id.map(|id| id.as_i64()))
        .bind(transaction.paid_at)
        .bind(transaction.finished_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        transaction.id = TransactionId::new(id);
        transaction.created_at = now;
        transaction.updated_at = now;
        Ok(())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_transaction(row),
            None => Err(StoreError::NotFound {
                entity: "transaction",
                id: id.as_i64(),
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<(Vec<Transaction>, u64)> {
        let mut predicate = String::from(match query.role {
            RoleScope::Buyer => "buyer_id = $1",
            RoleScope::Seller => "seller_id = $1",
            RoleScope::Either => "(buyer_id = $1 OR seller_id = $1)",
        });
        let mut param_count = 1;

        if query.product_id.is_some() {
            param_count += 1;
            predicate.push_str(&format!(" AND product_id = ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM transactions WHERE {predicate}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(query.user_id.as_i64());
        if let Some(product_id) = query.product_id {
            count_query = count_query.bind(product_id.as_i64());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE {predicate} \
             ORDER BY updated_at DESC, id DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        );
        let mut list_query = sqlx::query(&list_sql).bind(query.user_id.as_i64());
        if let Some(product_id) = query.product_id {
            list_query = list_query.bind(product_id.as_i64());
        }
        let rows = list_query
            .bind(i64::from(query.limit))
            .bind(i64::from(query.offset))
            .fetch_all(&self.pool)
            .await?;

        let transactions = rows
            .into_iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;

        Ok((transactions, total.max(0) as u64))
    }

    async fn update_transaction_state(
        &self,
        id: TransactionId,
        transaction: &mut Transaction,
    ) -> Result<()> {
        Self::update_transaction_state_with(&self.pool, id, transaction).await
    }
}

#[async_trait]
impl InvoiceRepository for PostgresStore {
    async fn insert_invoice(&self, invoice: &mut Invoice) -> Result<()> {
        Self::insert_invoice_with(&self.pool, invoice).await
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_invoice(row),
            None => Err(StoreError::NotFound {
                entity: "invoice",
                id: id.as_i64(),
            }),
        }
    }

    async fn get_invoice_by_transaction(&self, transaction_id: TransactionId) -> Result<Invoice> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE transaction_id = $1"
        ))
        .bind(transaction_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_invoice(row),
            None => Err(StoreError::NotFound {
                entity: "invoice",
                id: transaction_id.as_i64(),
            }),
        }
    }

    async fn update_invoice(&self, id: InvoiceId, invoice: &mut Invoice) -> Result<()> {
        Self::update_invoice_with(&self.pool, id, invoice).await
    }
}

#[async_trait]
impl ShippingRepository for PostgresStore {
    async fn insert_shipping(&self, shipping: &mut TransactionShipping) -> Result<()> {
        Self::insert_shipping_with(&self.pool, shipping).await
    }

    async fn get_shipping_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionShipping> {
        let row = sqlx::query(
            r#"
            SELECT id, transaction_id, awb_number, courier, created_at, updated_at
            FROM transaction_shippings
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_shipping(row),
            None => Err(StoreError::NotFound {
                entity: "transaction_shipping",
                id: transaction_id.as_i64(),
            }),
        }
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn get_user(&self, id: UserId) -> Result<User> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, phone, bank_name, bank_account, avatar, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "user",
            id: id.as_i64(),
        })?;

        Ok(User {
            id: UserId::new(row.try_get("id")?),
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            bank_name: row.try_get("bank_name")?,
            bank_account: row.try_get("bank_account")?,
            avatar: row.try_get("avatar")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, price, seller_id, country_id, image, status, from_date, to_date, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "product",
            id: id.as_i64(),
        })?;

        let status: i16 = row.try_get("status")?;
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: Money::new(row.try_get("price")?),
            seller_id: UserId::new(row.try_get("seller_id")?),
            country_id: CountryId::new(row.try_get("country_id")?),
            image: row.try_get("image")?,
            status: ProductStatus::from_code(status).ok_or(StoreError::InvalidColumn {
                column: "products.status",
                value: i64::from(status),
            })?,
            from_date: row.try_get("from_date")?,
            to_date: row.try_get("to_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl CountryRepository for PostgresStore {
    async fn get_country(&self, id: CountryId) -> Result<Country> {
        let row = sqlx::query("SELECT id, name, image FROM countries WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "country",
                id: id.as_i64(),
            })?;

        Ok(Country {
            id: CountryId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            image: row.try_get("image")?,
        })
    }
}

#[async_trait]
impl UserAddressRepository for PostgresStore {
    async fn get_user_address(&self, id: AddressId) -> Result<UserAddress> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, address, phone, address_name, created_at, updated_at
            FROM user_addresses
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "user_address",
            id: id.as_i64(),
        })?;

        Ok(UserAddress {
            id: AddressId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            address_name: row.try_get("address_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl DeviceRepository for PostgresStore {
    async fn get_device_by_user(&self, user_id: UserId) -> Result<Device> {
        let row = sqlx::query(
            r#"
            SELECT id, device_token, platform, user_id
            FROM user_devices
            WHERE user_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "user_device",
            id: user_id.as_i64(),
        })?;

        Ok(Device {
            id: DeviceId::new(row.try_get("id")?),
            device_token: row.try_get("device_token")?,
            platform: row.try_get("platform")?,
            user_id: UserId::new(row.try_get("user_id")?),
        })
    }
}

#[async_trait]
impl UnitOfWork for PostgresStore {
    #[tracing::instrument(skip_all, fields(transaction_id = %transaction.id))]
    async fn attach_invoice(
        &self,
        invoice: &mut Invoice,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::insert_invoice_with(&mut *tx, invoice).await?;
        transaction.invoice_id = Some(invoice.id);
        let id = transaction.id;
        Self::update_transaction_state_with(&mut *tx, id, transaction).await?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(invoice_id = %invoice.id))]
    async fn settle_invoice(
        &self,
        invoice: &mut Invoice,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let invoice_id = invoice.id;
        Self::update_invoice_with(&mut *tx, invoice_id, invoice).await?;
        let transaction_id = transaction.id;
        Self::update_transaction_state_with(&mut *tx, transaction_id, transaction).await?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(transaction_id = %transaction.id))]
    async fn ship_transaction(
        &self,
        shipping: &mut TransactionShipping,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::upsert_shipping_with(&mut *tx, shipping).await?;
        let id = transaction.id;
        Self::update_transaction_state_with(&mut *tx, id, transaction).await?;

        tx.commit().await?;
        Ok(())
    }
}
