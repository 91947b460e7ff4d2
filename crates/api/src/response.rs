//! JSON response envelope shared by every endpoint.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub status: u16,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

/// `{ data, error, message, meta }`, with empty parts omitted.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub meta: Meta,
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

fn reply<T>(status: StatusCode, data: Option<T>, message: &str, page: Option<Page>) -> Reply<T> {
    (
        status,
        Json(Envelope {
            data,
            error: None,
            message: message.to_string(),
            meta: Meta {
                status: status.as_u16(),
                page,
            },
        }),
    )
}

pub fn ok<T>(data: T) -> Reply<T> {
    reply(StatusCode::OK, Some(data), "", None)
}

pub fn ok_with_message<T>(data: Option<T>, message: &str) -> Reply<T> {
    reply(StatusCode::OK, data, message, None)
}

pub fn ok_with_page<T>(data: T, page: Page) -> Reply<T> {
    reply(StatusCode::OK, Some(data), "", Some(page))
}

pub fn created<T>(data: T) -> Reply<T> {
    reply(StatusCode::CREATED, Some(data), "", None)
}

pub fn error(status: StatusCode, code: &'static str, message: String) -> Reply<()> {
    (
        status,
        Json(Envelope {
            data: None,
            error: Some(ErrorBody { code, message }),
            message: String::new(),
            meta: Meta {
                status: status.as_u16(),
                page: None,
            },
        }),
    )
}
