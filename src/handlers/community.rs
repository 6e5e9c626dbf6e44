use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    db::{feed, posts},
    error::AppError,
    models::{
        page::{PageParams, PageRequest},
        post::CreatePostRequest,
        user::User,
    },
    utils::session::CurrentUser,
};

/// Publish a new post.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(me): Extension<User>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post = posts::create_post(&pool, me.id, &payload.body, Utc::now()).await?;
    tracing::info!(post_id = post.id, author = %me.nickname, "Post is now live");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Home feed: posts by everyone the current user follows, themselves included.
pub async fn get_feed(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(me): Extension<User>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::from_params(&params, config.posts_per_page);
    let feed = feed::followed_feed(&pool, me.id, page).await?;
    Ok(Json(feed))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = feed::post_view(&pool, current.id(), id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete a post. Only its author may do so; its hearts go with it.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(me): Extension<User>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    posts::delete_post(&pool, id, me.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
