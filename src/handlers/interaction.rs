use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    db::{feed, posts},
    error::AppError,
    models::{post::HeartResponse, user::User},
    state::AppState,
    utils::notify::spawn_follow_notification,
};

/// Heart a post. Hearting twice is a no-op.
pub async fn heart_post(
    State(state): State<AppState>,
    Extension(me): Extension<User>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    posts::heart(&state.pool, me.id, post_id).await?;

    Ok(Json(HeartResponse {
        post_id,
        hearted: true,
        hearts_count: posts::heart_count(&state.pool, post_id).await?,
    }))
}

/// Remove a heart. Unhearting a post that was never hearted is a no-op.
pub async fn unheart_post(
    State(state): State<AppState>,
    Extension(me): Extension<User>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if posts::get_post(&state.pool, post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    posts::unheart(&state.pool, me.id, post_id).await?;

    Ok(Json(HeartResponse {
        post_id,
        hearted: false,
        hearts_count: posts::heart_count(&state.pool, post_id).await?,
    }))
}

/// Follow a user by nickname. New follows notify the followed user.
pub async fn follow(
    State(state): State<AppState>,
    Extension(me): Extension<User>,
    Path(nickname): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (target, created) = feed::follow_user(&state.pool, &me, &nickname).await?;

    if created {
        spawn_follow_notification(state.notifier.clone(), me, target.clone());
    }

    Ok(Json(json!({
        "nickname": target.nickname,
        "following": true,
    })))
}

/// Stop following a user by nickname.
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(me): Extension<User>,
    Path(nickname): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (target, removed) = feed::unfollow_user(&state.pool, &me, &nickname).await?;
    if removed {
        tracing::info!(follower = %me.nickname, followed = %target.nickname, "Stopped following");
    }

    Ok(Json(json!({
        "nickname": target.nickname,
        "following": false,
    })))
}
