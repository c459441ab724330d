//! API Routes
//!
//! Route handlers organized by functionality.

pub mod chat;
pub mod dashboard;
pub mod health;

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Raw `Authorization` header, if it is valid UTF-8
pub(crate) fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}
