//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::data_uri::DataUriError;
use crate::services::StorageError;

/// Broad classes of failure, used by the boundary to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Conflict,
    Internal,
    Cancelled,
}

/// Errors that can occur during transaction and invoice operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced row does not exist.
    #[error("{context}: {source}")]
    NotFound {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The submitted form is malformed or incomplete.
    #[error("{0}")]
    Validation(String),

    /// Only the seller may change a transaction.
    #[error(
        "Kamu tidak bisa mengubah transaksi dalam status saat ini atau transaksi ini bukan milik kamu"
    )]
    EditTransactionForbidden,

    /// Only the buyer may create or change an invoice.
    #[error(
        "Kamu tidak bisa mengubah invoice dalam status saat ini atau invoice ini bukan milik kamu"
    )]
    EditInvoiceForbidden,

    /// A seller tried to buy their own product.
    #[error("Kamu tidak dapat membeli produk yang kamu list sendiri")]
    BuyOwnProduct,

    /// The delivery address belongs to another user.
    #[error("Alamat tidak sesuai dengan alamat yang sudah kamu simpan")]
    TransactionAddressNotOwned,

    /// The transaction already has an invoice.
    #[error("Transaksi sudah memiliki invoice")]
    TransactionInvoiceExists,

    /// The requested status is unknown or not reachable.
    #[error("Status transaksi tidak valid")]
    InvalidTransactionStateTransition,

    /// A repository call failed.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The blob storage backend failed.
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: StorageError,
    },

    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// The request ran past its deadline.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::EditTransactionForbidden | DomainError::EditInvoiceForbidden => {
                ErrorKind::Forbidden
            }
            DomainError::BuyOwnProduct
            | DomainError::TransactionAddressNotOwned
            | DomainError::TransactionInvoiceExists
            | DomainError::InvalidTransactionStateTransition => ErrorKind::Conflict,
            DomainError::Store { .. } | DomainError::Storage { .. } => ErrorKind::Internal,
            DomainError::Cancelled | DomainError::DeadlineExceeded => ErrorKind::Cancelled,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "not_found",
            DomainError::Validation(_) => "validation_error",
            DomainError::EditTransactionForbidden => "edit_transaction_forbidden",
            DomainError::EditInvoiceForbidden => "edit_invoice_forbidden",
            DomainError::BuyOwnProduct => "buy_own_product",
            DomainError::TransactionAddressNotOwned => "transaction_address_not_owned",
            DomainError::TransactionInvoiceExists => "transaction_invoice_exists",
            DomainError::InvalidTransactionStateTransition => {
                "invalid_transaction_state_transition"
            }
            DomainError::Store { .. } | DomainError::Storage { .. } => "internal_error",
            DomainError::Cancelled => "cancelled",
            DomainError::DeadlineExceeded => "deadline_exceeded",
        }
    }

    /// Wraps a repository error, keeping absence distinguishable.
    pub fn store(context: &'static str, source: StoreError) -> Self {
        if source.is_not_found() {
            DomainError::NotFound { context, source }
        } else {
            DomainError::Store { context, source }
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::Validation(errors.to_string())
    }
}

impl From<DataUriError> for DomainError {
    fn from(e: DataUriError) -> Self {
        DomainError::Validation(format!("Error parsing file: {e}"))
    }
}

/// Attaches call-site context to repository results.
pub(crate) trait StoreResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, DomainError>;
}

impl<T> StoreResultExt<T> for store::Result<T> {
    fn context(self, context: &'static str) -> Result<T, DomainError> {
        self.map_err(|e| DomainError::store(context, e))
    }
}
