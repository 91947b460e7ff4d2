//! Client-facing projections of stored records.

use chrono::{DateTime, Utc};
use common::{AddressId, CountryId, InvoiceId, Money, ProductId, TransactionId, UserId};
use serde::{Deserialize, Serialize};
use store::{
    Country, Invoice, InvoiceCode, Product, Transaction, TransactionShipping, User, UserAddress,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub bank_name: String,
    pub bank_account: String,
    pub registered_at: DateTime<Utc>,
    pub avatar: String,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            bank_name: user.bank_name.clone(),
            bank_account: user.bank_account.clone(),
            registered_at: user.created_at,
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryPublic {
    pub id: CountryId,
    pub name: String,
    pub image: String,
}

impl From<&Country> for CountryPublic {
    fn from(country: &Country) -> Self {
        Self {
            id: country.id,
            name: country.name.clone(),
            image: country.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPublic {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub seller: UserPublic,
    pub country: CountryPublic,
    pub status: String,
    /// Listing window, formatted `YYYY-MM-DD`.
    pub from_date: String,
    pub to_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductPublic {
    pub fn new(product: &Product, country: &Country, seller: &User) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            seller: seller.into(),
            country: country.into(),
            status: product.status.as_str().to_string(),
            from_date: product.from_date.format(DATE_FORMAT).to_string(),
            to_date: product.to_date.format(DATE_FORMAT).to_string(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressPublic {
    pub id: AddressId,
    pub address: String,
    pub phone: String,
    pub address_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserAddress> for UserAddressPublic {
    fn from(address: &UserAddress) -> Self {
        Self {
            id: address.id,
            address: address.address.clone(),
            phone: address.phone.clone(),
            address_name: address.address_name.clone(),
            created_at: address.created_at,
            updated_at: address.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPublic {
    pub awb_number: String,
    pub courier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TransactionShipping> for ShippingPublic {
    fn from(shipping: &TransactionShipping) -> Self {
        Self {
            awb_number: shipping.awb_number.clone(),
            courier: shipping.courier.clone(),
            created_at: shipping.created_at,
            updated_at: shipping.updated_at,
        }
    }
}

/// A transaction with every record it references resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPublic {
    pub id: TransactionId,
    pub product: ProductPublic,
    pub buyer: UserPublic,
    pub buyer_address: UserAddressPublic,
    pub quantity: u32,
    pub notes: String,
    pub total_price: Money,
    pub status: String,
    pub invoice_id: Option<InvoiceId>,
    pub shipping: Option<ShippingPublic>,
    pub paid_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The records a [`TransactionPublic`] is assembled from.
pub struct TransactionParts {
    pub transaction: Transaction,
    pub product: Product,
    pub country: Country,
    pub seller: User,
    pub buyer: User,
    pub buyer_address: UserAddress,
    pub shipping: Option<TransactionShipping>,
}

impl From<TransactionParts> for TransactionPublic {
    fn from(parts: TransactionParts) -> Self {
        let TransactionParts {
            transaction,
            product,
            country,
            seller,
            buyer,
            buyer_address,
            shipping,
        } = parts;

        Self {
            id: transaction.id,
            product: ProductPublic::new(&product, &country, &seller),
            buyer: (&buyer).into(),
            buyer_address: (&buyer_address).into(),
            quantity: transaction.quantity,
            notes: transaction.notes,
            total_price: transaction.total_price,
            status: transaction.status.as_str().to_string(),
            invoice_id: transaction.invoice_id,
            shipping: shipping.as_ref().map(ShippingPublic::from),
            paid_at: transaction.paid_at,
            finished_at: transaction.finished_at,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePublic {
    pub id: InvoiceId,
    pub transaction_id: TransactionId,
    pub invoice_code: InvoiceCode,
    pub coded_price: Money,
    pub payment_method: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub receipt_proof: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoicePublic {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            transaction_id: invoice.transaction_id,
            invoice_code: invoice.invoice_code.clone(),
            coded_price: invoice.coded_price,
            payment_method: invoice.payment_method.clone(),
            status: invoice.status.as_str().to_string(),
            paid_at: invoice.paid_at,
            receipt_proof: invoice.receipt_proof.clone(),
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}
