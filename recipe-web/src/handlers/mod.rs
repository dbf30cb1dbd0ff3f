pub mod auth;
pub mod profile;
pub mod recipes;
pub mod search;

use axum::response::IntoResponse;

use crate::error::AppError;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Page".to_string())
}
