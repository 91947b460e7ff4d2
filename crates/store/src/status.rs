//! Status tables for transactions, invoices and products.
//!
//! Statuses are persisted as small integers and exposed to clients as
//! strings; both mappings are fixed and must stay exact inverses.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A status string or code that is not part of a fixed table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {table} status: {value}")]
pub struct UnknownStatus {
    pub table: &'static str,
    pub value: String,
}

/// The state of a transaction in its lifecycle.
///
/// Usual progression:
/// ```text
/// placed ──► paid ──► in_progress ──► delivered ──► finished
///   │          │           │
///   ├──► expired           │
///   └──────────┴───────────┴──► rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Order placed by the buyer, awaiting payment.
    #[default]
    Placed,

    /// Payment confirmed.
    Paid,

    /// Seller is preparing the order.
    InProgress,

    /// Handed to a courier; a shipping record exists.
    Delivered,

    /// Buyer received the goods (terminal state).
    Finished,

    /// Seller rejected the order (terminal state).
    Rejected,

    /// Order lapsed without payment (terminal state).
    Expired,
}

impl TransactionStatus {
    /// All statuses in code order.
    pub const ALL: [TransactionStatus; 7] = [
        TransactionStatus::Placed,
        TransactionStatus::Paid,
        TransactionStatus::InProgress,
        TransactionStatus::Delivered,
        TransactionStatus::Finished,
        TransactionStatus::Rejected,
        TransactionStatus::Expired,
    ];

    /// Returns the persisted integer code.
    pub fn code(&self) -> i16 {
        match self {
            TransactionStatus::Placed => 0,
            TransactionStatus::Paid => 1,
            TransactionStatus::InProgress => 2,
            TransactionStatus::Delivered => 3,
            TransactionStatus::Finished => 4,
            TransactionStatus::Rejected => 5,
            TransactionStatus::Expired => 6,
        }
    }

    /// Resolves a persisted integer code.
    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Returns the status name as exposed to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Placed => "placed",
            TransactionStatus::Paid => "paid",
            TransactionStatus::InProgress => "in_progress",
            TransactionStatus::Delivered => "delivered",
            TransactionStatus::Finished => "finished",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Expired => "expired",
        }
    }

    /// Returns true if no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Finished | TransactionStatus::Rejected | TransactionStatus::Expired
        )
    }

    /// Returns true if `target` is adjacent to this status in the lifecycle
    /// graph above.
    pub fn can_transition_to(&self, target: TransactionStatus) -> bool {
        use TransactionStatus::*;

        matches!(
            (self, target),
            (Placed, Paid | Rejected | Expired)
                | (Paid, InProgress | Rejected)
                | (InProgress, Delivered | Rejected)
                | (Delivered, Finished)
        )
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    /// Parses a status name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| UnknownStatus {
                table: "transaction",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Expired,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 3] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Expired,
    ];

    pub fn code(&self) -> i16 {
        match self {
            InvoiceStatus::Pending => 0,
            InvoiceStatus::Paid => 1,
            InvoiceStatus::Expired => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Listing state of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    #[default]
    Idle,
    Offered,
    OutOfStock,
}

impl ProductStatus {
    pub fn code(&self) -> i16 {
        match self {
            ProductStatus::Idle => 0,
            ProductStatus::Offered => 1,
            ProductStatus::OutOfStock => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(ProductStatus::Idle),
            1 => Some(ProductStatus::Offered),
            2 => Some(ProductStatus::OutOfStock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Idle => "idle",
            ProductStatus::Offered => "offered",
            ProductStatus::OutOfStock => "out of stock",
        }
    }
}
