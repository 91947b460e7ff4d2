//! Row-shaped records for every table the marketplace reads or writes.

use chrono::{DateTime, NaiveDate, Utc};
use common::{
    AddressId, CountryId, DeviceId, InvoiceId, Money, ProductId, ShippingId, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};

use crate::{InvoiceCode, InvoiceStatus, ProductStatus, TransactionStatus};

/// A purchase of one product by one buyer from its seller.
///
/// Transactions are never deleted. `total_price` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub product_id: ProductId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub buyer_address_id: AddressId,
    pub quantity: u32,
    pub notes: String,
    pub total_price: Money,
    pub status: TransactionStatus,
    pub invoice_id: Option<InvoiceId>,
    pub paid_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a new, not yet persisted transaction in the `placed` state.
    ///
    /// The id and timestamps are assigned by the repository on create.
    #[allow(clippy::too_many_arguments)]
    pub fn placed(
        product_id: ProductId,
        buyer_id: UserId,
        seller_id: UserId,
        buyer_address_id: AddressId,
        quantity: u32,
        notes: String,
        total_price: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::default(),
            product_id,
            buyer_id,
            seller_id,
            buyer_address_id,
            quantity,
            notes,
            total_price,
            status: TransactionStatus::Placed,
            invoice_id: None,
            paid_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A payment request issued for exactly one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub transaction_id: TransactionId,
    pub invoice_code: InvoiceCode,
    pub coded_price: Money,
    pub payment_method: String,
    pub status: InvoiceStatus,
    pub paid_at: Option<DateTime<Utc>>,
    /// Public location of the uploaded receipt; empty when none was sent.
    pub receipt_proof: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Builds a pending invoice for a transaction.
    pub fn pending(
        transaction_id: TransactionId,
        invoice_code: InvoiceCode,
        coded_price: Money,
        payment_method: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::default(),
            transaction_id,
            invoice_code,
            coded_price,
            payment_method,
            status: InvoiceStatus::Pending,
            paid_at: None,
            receipt_proof: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_receipt(&self) -> bool {
        !self.receipt_proof.is_empty()
    }
}

/// Courier details recorded when a transaction is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionShipping {
    pub id: ShippingId,
    pub transaction_id: TransactionId,
    pub awb_number: String,
    pub courier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionShipping {
    pub fn new(transaction_id: TransactionId, awb_number: String, courier: String) -> Self {
        let now = Utc::now();
        Self {
            id: ShippingId::default(),
            transaction_id,
            awb_number,
            courier,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub bank_name: String,
    pub bank_account: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub seller_id: UserId,
    pub country_id: CountryId,
    pub image: String,
    pub status: ProductStatus,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddress {
    pub id: AddressId,
    pub user_id: UserId,
    pub address: String,
    pub phone: String,
    pub address_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub image: String,
}

/// A push-notification target registered by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_token: String,
    pub platform: String,
    pub user_id: UserId,
}
