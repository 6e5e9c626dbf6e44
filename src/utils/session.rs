// src/utils/session.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::users,
    error::AppError,
    models::user::User,
    state::AppState,
    utils::jwt::verify_jwt,
};

/// Who is making the current request.
/// Inserted into the request extensions by `session_middleware`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum CurrentUser {
    Authenticated(User),
    Anonymous,
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Authenticated(user) => Some(user),
            CurrentUser::Anonymous => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.user().map(|user| user.id)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(Some)
        .ok_or(AppError::AuthError("Invalid authorization header".to_string()))
}

/// Axum Middleware: Session.
///
/// Resolves the 'Authorization: Bearer <token>' header into a `CurrentUser`.
/// A request without the header is `Anonymous`; a bad token or a deleted account
/// is rejected with 401. Authenticated requests refresh the user's `last_seen`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?.map(str::to_owned);

    let current = match token {
        None => CurrentUser::Anonymous,
        Some(token) => {
            let claims = verify_jwt(&token, &state.config.jwt_secret)?;
            let mut user = users::find_by_id(&state.pool, claims.user_id()?)
                .await?
                .ok_or(AppError::AuthError("Unknown user".to_string()))?;

            let now = Utc::now();
            users::touch_last_seen(&state.pool, user.id, now).await?;
            user.last_seen = Some(now);

            CurrentUser::Authenticated(user)
        }
    };

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Axum Middleware: Login required.
///
/// Must run inside `session_middleware`. Rejects anonymous requests with 401 and
/// exposes the authenticated `User` directly to handlers.
pub async fn require_login(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser::Authenticated(user)) => user.clone(),
        _ => {
            return Err(AppError::AuthError(
                "Please log in to access this page.".to_string(),
            ));
        }
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
