// src/handlers/mod.rs

use axum::{http::Uri, response::IntoResponse};

use crate::error::AppError;

pub mod auth;
pub mod community;
pub mod interaction;
pub mod profile;
pub mod users;

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    AppError::NotFound(format!("URL {} was not found", uri.path()))
}
