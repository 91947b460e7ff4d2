//! Invoices: payment requests against a transaction, receipt uploads and
//! payment confirmation.

mod forms;
mod service;

pub use forms::{InvoiceCreateForm, InvoiceUpdateForm};
pub use service::{InvoiceService, RECEIPT_PROOF_DIR};
