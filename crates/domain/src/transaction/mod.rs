//! Transaction lifecycle: placing orders, listing them and status changes.

mod filter;
mod forms;
mod service;

pub use filter::TransactionFilter;
pub use forms::{TransactionForm, UpdateTransactionForm};
pub use service::{TransactionService, TransitionPolicy};
