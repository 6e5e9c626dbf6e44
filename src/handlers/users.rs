use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db::{feed, users},
    error::AppError,
    models::{
        page::{PageParams, PageRequest},
        user::SearchParams,
    },
    utils::session::CurrentUser,
};

/// Public profile of a user.
pub async fn get_user(
    State(pool): State<SqlitePool>,
    Extension(current): Extension<CurrentUser>,
    Path(nickname): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = feed::profile(&pool, current.user(), &nickname).await?;
    Ok(Json(profile))
}

/// A user's posts, most recent first.
pub async fn list_user_posts(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(current): Extension<CurrentUser>,
    Path(nickname): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let author = users::find_by_nickname(&pool, &nickname)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found.", nickname)))?;

    let page = PageRequest::from_params(&params, config.posts_per_page);
    let posts = feed::user_posts(&pool, current.id(), author.id, page).await?;

    Ok(Json(posts))
}

/// Exact nickname search. No match is an empty list, not an error.
pub async fn search(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Search query must not be empty.".to_string()));
    }

    let results = feed::search_users_exact(&pool, query, config.max_search_results).await?;
    Ok(Json(results))
}
