//! Transaction endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use common::TransactionId;
use domain::{TransactionFilter, TransactionForm, TransactionPublic, UpdateTransactionForm};
use store::{DEFAULT_LIMIT, Store};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{self, Page, Reply};

/// Malformed or negative values fall back to the default.
fn page_param(params: &HashMap<String, String>, key: &str, default: u32) -> u32 {
    params
        .get(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// POST /transactions
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id()))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<TransactionForm>, JsonRejection>,
) -> Result<Reply<TransactionPublic>, ApiError> {
    let Json(form) = payload?;
    let transaction = state
        .transactions
        .create_transaction(&state.context(), actor, form)
        .await?;

    Ok(response::created(transaction))
}

/// GET /transactions?limit=&offset=&role=&product_id=
///
/// Lists the caller's transactions as buyer, seller or both.
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id()))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Reply<Vec<TransactionPublic>>, ApiError> {
    let limit = page_param(&params, "limit", DEFAULT_LIMIT);
    let offset = page_param(&params, "offset", 0);
    let filter = TransactionFilter::from_params(&params)?;

    let (transactions, total) = state
        .transactions
        .get_transactions(&state.context(), actor, filter, limit, offset)
        .await?;

    Ok(response::ok_with_page(
        transactions,
        Page {
            limit,
            offset,
            total,
        },
    ))
}

/// GET /transactions/{id}
#[tracing::instrument(skip_all)]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(_): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Reply<TransactionPublic>, ApiError> {
    let Path(id) = id?;
    let transaction = state
        .transactions
        .get_transaction(&state.context(), TransactionId::new(id))
        .await?;

    Ok(response::ok(transaction))
}

/// PATCH /transactions/{id}
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id()))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTransactionForm>, JsonRejection>,
) -> Result<Reply<()>, ApiError> {
    let Path(id) = id?;
    let Json(form) = payload?;
    state
        .transactions
        .update_transaction(&state.context(), actor, TransactionId::new(id), form)
        .await?;

    Ok(response::ok_with_message(None, "Transaksi berhasil diperbarui"))
}
