//! Wires configuration into concrete collaborators.

use std::sync::Arc;

use domain::{InvoiceService, Notifier, Storage, TransactionService};
use infra::{LocalStorage, LogNotifier, ObjectStorage, PubsubNotifier};
use store::Store;

use crate::AppState;
use crate::auth::JwtVerifier;
use crate::config::{Config, ConfigError, StorageBackend};

pub fn storage(config: &Config) -> Result<Arc<dyn Storage>, ConfigError> {
    match config.storage_backend {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(&config.storage_local_root))),
        StorageBackend::Gcs => {
            let bucket = config.gcs_bucket.clone().ok_or(ConfigError::Missing {
                var: "GCS_BUCKET",
                reason: "STORAGE_BACKEND is gcs",
            })?;
            let token = config.gcs_access_token.clone().unwrap_or_default();
            Ok(Arc::new(ObjectStorage::new(bucket, token)))
        }
    }
}

/// Pub/Sub when a project is configured, otherwise notifications are only
/// logged.
pub fn notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.pubsub_project_id {
        Some(project) => Arc::new(PubsubNotifier::new(
            project.clone(),
            config.pubsub_topic.clone(),
            config.pubsub_access_token.clone().unwrap_or_default(),
        )),
        None => Arc::new(LogNotifier),
    }
}

/// Builds the application state around `store`.
pub fn build_state<S: Store>(store: S, config: &Config) -> Result<Arc<AppState<S>>, ConfigError> {
    Ok(state_with(store, storage(config)?, notifier(config), config))
}

/// Assembles state from explicit collaborators; used where the defaults
/// from configuration are not wanted.
pub fn state_with<S: Store>(
    store: S,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        transactions: TransactionService::new(store.clone(), notifier),
        invoices: InvoiceService::new(store, storage),
        verifier: JwtVerifier::new(&config.jwt_secret),
        request_timeout: config.request_timeout,
    })
}
