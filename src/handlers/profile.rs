use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    db::users,
    error::AppError,
    models::user::{MeResponse, UpdateProfileRequest, User},
    utils::avatar,
};

fn me_response(user: User) -> MeResponse {
    MeResponse {
        avatar: avatar::gravatar_url(&user.email, avatar::DEFAULT_SIZE),
        id: user.id,
        nickname: user.nickname,
        email: user.email,
        about_me: user.about_me,
        last_seen: user.last_seen,
    }
}

/// Get the current user's own profile.
pub async fn get_me(Extension(me): Extension<User>) -> impl IntoResponse {
    Json(me_response(me))
}

/// Edit nickname and about-me.
pub async fn update_me(
    State(pool): State<SqlitePool>,
    Extension(me): Extension<User>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::update_profile(&pool, me.id, &payload).await?;
    tracing::info!(user_id = user.id, "Profile changes saved");
    Ok(Json(me_response(user)))
}

/// Delete the current account, its posts, hearts and follow edges.
pub async fn delete_me(
    State(pool): State<SqlitePool>,
    Extension(me): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    users::delete_user(&pool, me.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
