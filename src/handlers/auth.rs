// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    db::users,
    error::AppError,
    models::user::LoginRequest,
    state::AppState,
    utils::{jwt::sign_jwt, session::CurrentUser},
};

/// Logs in with the identity provider's verified assertion.
///
/// Unknown emails get a new account (sanitized unique nickname, self-follow).
/// Returns a session token and the user.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = match users::find_by_email(&state.pool, &payload.email).await? {
        Some(user) => user,
        None => match users::create_user(&state.pool, payload.nickname.as_deref(), &payload.email).await {
            Ok(user) => user,
            // Another request created this account between our lookup and insert.
            Err(AppError::Conflict(msg)) => users::find_by_email(&state.pool, &payload.email)
                .await?
                .ok_or(AppError::Conflict(msg))?,
            Err(e) => return Err(e),
        },
    };

    let token = sign_jwt(user.id, &state.config.jwt_secret, state.config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}

/// Reports the session state of the caller.
pub async fn session(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Json(current)
}
