//! Liveness probe.

use serde::Serialize;

use crate::response::{self, Reply};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn check() -> Reply<Health> {
    response::ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
