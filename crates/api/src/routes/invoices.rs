//! Invoice endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use common::InvoiceId;
use domain::{InvoiceCreateForm, InvoicePublic, InvoiceUpdateForm};
use store::Store;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{self, Reply};

/// POST /invoices
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id()))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<InvoiceCreateForm>, JsonRejection>,
) -> Result<Reply<InvoicePublic>, ApiError> {
    let Json(form) = payload?;
    let invoice = state
        .invoices
        .insert_invoice(&state.context(), actor, form)
        .await?;

    Ok(response::created(invoice))
}

/// GET /invoices/{id}
#[tracing::instrument(skip_all)]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(_): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Reply<InvoicePublic>, ApiError> {
    let Path(id) = id?;
    let invoice = state
        .invoices
        .get_invoice(&state.context(), InvoiceId::new(id))
        .await?;

    Ok(response::ok(invoice))
}

/// PATCH /invoices/{id}
///
/// Accepts a receipt upload, a payment confirmation, or both.
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id()))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<InvoiceUpdateForm>, JsonRejection>,
) -> Result<Reply<InvoicePublic>, ApiError> {
    let Path(id) = id?;
    let Json(form) = payload?;
    let invoice = state
        .invoices
        .update_invoice(&state.context(), actor, InvoiceId::new(id), form)
        .await?;

    Ok(response::ok_with_message(
        Some(invoice),
        "Transaksi berhasil diperbarui",
    ))
}
