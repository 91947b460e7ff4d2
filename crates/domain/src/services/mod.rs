//! Outbound collaborator traits and in-memory implementations.

pub mod notifier;
pub mod storage;

pub use notifier::{InMemoryNotifier, NotificationData, NotificationRequest, Notifier};
pub use storage::{InMemoryStorage, Storage, StorageError};
