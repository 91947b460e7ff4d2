//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{AddressId, InvoiceId, Money, ProductId, TransactionId, UserId};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    DeviceRepository, Invoice, InvoiceCode, InvoiceRepository, InvoiceStatus, PostgresStore,
    ProductRepository, RoleScope, ShippingRepository, StoreError, Transaction, TransactionQuery,
    TransactionRepository, TransactionShipping, TransactionStatus, UnitOfWork,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_marketplace_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Reference rows every test starts from.
struct Fixture {
    store: PostgresStore,
    pool: PgPool,
    buyer: UserId,
    seller: UserId,
    product: ProductId,
    address: AddressId,
}

async fn get_fixture() -> Fixture {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE transaction_shippings, invoices, transactions, user_devices, \
         user_addresses, products, countries, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    let buyer: i64 =
        sqlx::query_scalar("INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id")
            .bind("budi@example.com")
            .bind("Budi")
            .fetch_one(&pool)
            .await
            .unwrap();
    let seller: i64 =
        sqlx::query_scalar("INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id")
            .bind("sari@example.com")
            .bind("Sari")
            .fetch_one(&pool)
            .await
            .unwrap();
    let country: i64 = sqlx::query_scalar("INSERT INTO countries (name) VALUES ($1) RETURNING id")
        .bind("Japan")
        .fetch_one(&pool)
        .await
        .unwrap();
    let product: i64 = sqlx::query_scalar(
        "INSERT INTO products (title, price, seller_id, country_id, status, from_date, to_date) \
         VALUES ($1, $2, $3, $4, 1, CURRENT_DATE, CURRENT_DATE + 30) RETURNING id",
    )
    .bind("Matcha")
    .bind(5000_i64)
    .bind(seller)
    .bind(country)
    .fetch_one(&pool)
    .await
    .unwrap();
    let address: i64 = sqlx::query_scalar(
        "INSERT INTO user_addresses (user_id, address) VALUES ($1, $2) RETURNING id",
    )
    .bind(buyer)
    .bind("Jl. Merdeka No. 1")
    .fetch_one(&pool)
    .await
    .unwrap();

    Fixture {
        store: PostgresStore::new(pool.clone()),
        pool,
        buyer: UserId::new(buyer),
        seller: UserId::new(seller),
        product: ProductId::new(product),
        address: AddressId::new(address),
    }
}

async fn place(fixture: &Fixture) -> Transaction {
    let mut tx = Transaction::placed(
        fixture.product,
        fixture.buyer,
        fixture.seller,
        fixture.address,
        2,
        "handle with care".to_string(),
        Money::new(10_000),
    );
    fixture.store.create_transaction(&mut tx).await.unwrap();
    tx
}

fn pending_invoice(tx: &Transaction) -> Invoice {
    Invoice::pending(
        tx.id,
        InvoiceCode::generate(Utc::now().date_naive(), tx.id),
        tx.total_price,
        "bank_transfer".to_string(),
    )
}

#[tokio::test]
#[serial]
async fn create_and_get_transaction() {
    let fixture = get_fixture().await;
    let tx = place(&fixture).await;

    assert!(tx.id.is_valid());
    let stored = fixture.store.get_transaction(tx.id).await.unwrap();
    assert_eq!(stored, tx);
    assert_eq!(stored.status, TransactionStatus::Placed);
}

#[tokio::test]
#[serial]
async fn missing_transaction_is_not_found() {
    let fixture = get_fixture().await;

    let err = fixture
        .store
        .get_transaction(TransactionId::new(4242))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[serial]
async fn reference_reads() {
    let fixture = get_fixture().await;

    let product = fixture.store.get_product(fixture.product).await.unwrap();
    assert_eq!(product.seller_id, fixture.seller);
    assert_eq!(product.price, Money::new(5000));

    let err = fixture
        .store
        .get_device_by_user(fixture.seller)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[serial]
async fn list_by_role_and_product() {
    let fixture = get_fixture().await;
    let first = place(&fixture).await;
    let second = place(&fixture).await;

    let (page, total) = fixture
        .store
        .list_transactions(&TransactionQuery::for_user(fixture.buyer))
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(page[0].id, second.id);
    assert_eq!(page[1].id, first.id);

    let (page, total) = fixture
        .store
        .list_transactions(&TransactionQuery::for_user(fixture.buyer).role(RoleScope::Seller))
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(page.is_empty());

    let query = TransactionQuery::for_user(fixture.seller)
        .role(RoleScope::Seller)
        .product_id(fixture.product)
        .limit(1)
        .offset(1);
    let (page, total) = fixture.store.list_transactions(&query).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, first.id);
}

#[tokio::test]
#[serial]
async fn update_state_requires_exactly_one_row() {
    let fixture = get_fixture().await;
    let mut tx = place(&fixture).await;

    tx.status = TransactionStatus::Finished;
    tx.finished_at = Some(Utc::now());
    fixture
        .store
        .update_transaction_state(tx.id, &mut tx)
        .await
        .unwrap();
    let stored = fixture.store.get_transaction(tx.id).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Finished);
    assert!(stored.finished_at.is_some());

    let result = fixture
        .store
        .update_transaction_state(TransactionId::new(4242), &mut tx)
        .await;
    assert!(matches!(
        result,
        Err(StoreError::RowCountMismatch { affected: 0, .. })
    ));
}

#[tokio::test]
#[serial]
async fn attach_invoice_links_transaction_once() {
    let fixture = get_fixture().await;
    let mut tx = place(&fixture).await;

    let mut invoice = pending_invoice(&tx);
    fixture
        .store
        .attach_invoice(&mut invoice, &mut tx)
        .await
        .unwrap();

    let stored = fixture.store.get_transaction(tx.id).await.unwrap();
    assert_eq!(stored.invoice_id, Some(invoice.id));
    let by_tx = fixture
        .store
        .get_invoice_by_transaction(tx.id)
        .await
        .unwrap();
    assert_eq!(by_tx.invoice_code, invoice.invoice_code);

    let result = fixture
        .store
        .attach_invoice(&mut pending_invoice(&tx), &mut tx)
        .await;
    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
}

#[tokio::test]
#[serial]
async fn attach_invoice_rolls_back_when_transaction_is_missing() {
    let fixture = get_fixture().await;
    let tx = place(&fixture).await;

    let mut orphan = tx.clone();
    orphan.id = TransactionId::new(4242);
    let mut invoice = pending_invoice(&tx);
    let result = fixture.store.attach_invoice(&mut invoice, &mut orphan).await;
    assert!(result.is_err());

    let err = fixture
        .store
        .get_invoice_by_transaction(tx.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[serial]
async fn settle_invoice_marks_both_paid() {
    let fixture = get_fixture().await;
    let mut tx = place(&fixture).await;
    let mut invoice = pending_invoice(&tx);
    fixture
        .store
        .attach_invoice(&mut invoice, &mut tx)
        .await
        .unwrap();

    let now = Utc::now();
    invoice.status = InvoiceStatus::Paid;
    invoice.paid_at = Some(now);
    tx.status = TransactionStatus::Paid;
    tx.paid_at = Some(now);
    fixture
        .store
        .settle_invoice(&mut invoice, &mut tx)
        .await
        .unwrap();

    let stored_invoice = fixture.store.get_invoice(invoice.id).await.unwrap();
    let stored_tx = fixture.store.get_transaction(tx.id).await.unwrap();
    assert_eq!(stored_invoice.status, InvoiceStatus::Paid);
    assert_eq!(stored_tx.status, TransactionStatus::Paid);
    assert_eq!(stored_invoice.paid_at, stored_tx.paid_at);
}

#[tokio::test]
#[serial]
async fn update_missing_invoice_is_row_count_mismatch() {
    let fixture = get_fixture().await;
    let tx = place(&fixture).await;

    let mut invoice = pending_invoice(&tx);
    let result = fixture
        .store
        .update_invoice(InvoiceId::new(4242), &mut invoice)
        .await;
    assert!(matches!(result, Err(StoreError::RowCountMismatch { .. })));
}

#[tokio::test]
#[serial]
async fn ship_transaction_records_courier() {
    let fixture = get_fixture().await;
    let mut tx = place(&fixture).await;

    tx.status = TransactionStatus::Delivered;
    let mut shipping = TransactionShipping::new(tx.id, "AWB123".to_string(), "JNE".to_string());
    fixture
        .store
        .ship_transaction(&mut shipping, &mut tx)
        .await
        .unwrap();

    let stored = fixture
        .store
        .get_shipping_by_transaction(tx.id)
        .await
        .unwrap();
    assert_eq!(stored.awb_number, "AWB123");
    assert_eq!(stored.courier, "JNE");
    let stored_tx = fixture.store.get_transaction(tx.id).await.unwrap();
    assert_eq!(stored_tx.status, TransactionStatus::Delivered);
}

#[tokio::test]
#[serial]
async fn ship_transaction_again_replaces_tracking() {
    let fixture = get_fixture().await;
    let mut tx = place(&fixture).await;
    tx.status = TransactionStatus::Delivered;

    let mut first = TransactionShipping::new(tx.id, "AWB-OLD".to_string(), "JNE".to_string());
    fixture
        .store
        .ship_transaction(&mut first, &mut tx)
        .await
        .unwrap();
    let mut second =
        TransactionShipping::new(tx.id, "AWB-NEW".to_string(), "SiCepat".to_string());
    fixture
        .store
        .ship_transaction(&mut second, &mut tx)
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transaction_shippings WHERE transaction_id = $1")
            .bind(tx.id.as_i64())
            .fetch_one(&fixture.pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
    let stored = fixture
        .store
        .get_shipping_by_transaction(tx.id)
        .await
        .unwrap();
    assert_eq!(stored.awb_number, "AWB-NEW");
    assert_eq!(stored.courier, "SiCepat");
}

#[tokio::test]
#[serial]
async fn insert_shipping_twice_is_duplicate() {
    let fixture = get_fixture().await;
    let tx = place(&fixture).await;

    let mut first = TransactionShipping::new(tx.id, "AWB-1".to_string(), "JNE".to_string());
    fixture.store.insert_shipping(&mut first).await.unwrap();
    let mut second = TransactionShipping::new(tx.id, "AWB-2".to_string(), "JNE".to_string());
    let result = fixture.store.insert_shipping(&mut second).await;

    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
}
