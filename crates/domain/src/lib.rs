//! Marketplace usecases.
//!
//! This crate holds the business rules of the marketplace:
//! - `TransactionService` places orders and moves them through their lifecycle
//! - `InvoiceService` issues invoices and records payment
//! - `RequestContext` carries cancellation and deadlines into every call
//! - the `Storage` and `Notifier` traits describe outbound collaborators

pub mod context;
pub mod data_uri;
pub mod error;
pub mod invoice;
pub mod public;
pub mod services;
pub mod transaction;

pub use context::RequestContext;
pub use error::{DomainError, ErrorKind};
pub use invoice::{InvoiceCreateForm, InvoiceService, InvoiceUpdateForm};
pub use public::{
    CountryPublic, InvoicePublic, ProductPublic, ShippingPublic, TransactionPublic,
    UserAddressPublic, UserPublic,
};
pub use services::{
    InMemoryNotifier, InMemoryStorage, NotificationData, NotificationRequest, Notifier, Storage,
    StorageError,
};
pub use transaction::{
    TransactionFilter, TransactionForm, TransactionService, TransitionPolicy,
    UpdateTransactionForm,
};
