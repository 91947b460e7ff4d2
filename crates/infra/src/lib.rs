//! Concrete backends for the outbound collaborators of the marketplace.
//!
//! Storage:
//! - `LocalStorage` writes uploads under a directory on disk
//! - `ObjectStorage` uploads to a Google Cloud Storage bucket
//!
//! Notifications:
//! - `PubsubNotifier` publishes push requests to a Pub/Sub topic
//! - `LogNotifier` only logs them, for setups without Pub/Sub

pub mod notifier;
pub mod storage;

pub use notifier::{DEFAULT_TOPIC, LogNotifier, PublishError, PubsubNotifier};
pub use storage::{LocalStorage, ObjectStorage};
