// src/db/feed.rs
//
// Read-side queries composing users and posts, plus the follow actions that
// need both (target lookup by nickname, self-follow policy).

use sqlx::SqlitePool;

use super::{USER_COLUMNS, users};
use crate::{
    error::AppError,
    models::{
        page::{Page, PageRequest},
        post::PostView,
        user::{ProfileView, User},
    },
    utils::avatar,
};

/// Post + author + heart state. `$1` is the viewer id, NULL for anonymous.
const POST_VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.body, p.timestamp, p.user_id,
        u.nickname AS author_nickname,
        u.email AS author_email,
        (SELECT COUNT(*) FROM post_hearts h WHERE h.post_id = p.id) AS hearts_count,
        EXISTS(
            SELECT 1 FROM post_hearts h WHERE h.post_id = p.id AND h.user_id = $1
        ) AS hearted
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

fn with_avatar(mut view: PostView) -> PostView {
    view.author_avatar = avatar::gravatar_url(&view.author_email, avatar::DEFAULT_SIZE);
    view
}

/// Posts by every user `user_id` follows, most recent first.
///
/// Own posts show up through the self-follow row created with the account.
pub async fn followed_feed(
    pool: &SqlitePool,
    user_id: i64,
    page: PageRequest,
) -> Result<Page<PostView>, AppError> {
    let sql = format!(
        r#"{}
        JOIN followers f ON f.followed_id = p.user_id
        WHERE f.follower_id = $1
        ORDER BY p.timestamp DESC, p.id DESC
        LIMIT $2 OFFSET $3
        "#,
        POST_VIEW_SELECT
    );

    let rows = sqlx::query_as::<_, PostView>(&sql)
        .bind(user_id)
        .bind(page.fetch_limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load feed: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Page::from_overfetch(rows, page).map(with_avatar))
}

/// One author's posts as seen by `viewer_id`.
pub async fn user_posts(
    pool: &SqlitePool,
    viewer_id: Option<i64>,
    author_id: i64,
    page: PageRequest,
) -> Result<Page<PostView>, AppError> {
    let sql = format!(
        r#"{}
        WHERE p.user_id = $2
        ORDER BY p.timestamp DESC, p.id DESC
        LIMIT $3 OFFSET $4
        "#,
        POST_VIEW_SELECT
    );

    let rows = sqlx::query_as::<_, PostView>(&sql)
        .bind(viewer_id)
        .bind(author_id)
        .bind(page.fetch_limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok(Page::from_overfetch(rows, page).map(with_avatar))
}

pub async fn post_view(
    pool: &SqlitePool,
    viewer_id: Option<i64>,
    post_id: i64,
) -> Result<Option<PostView>, AppError> {
    let sql = format!("{} WHERE p.id = $2", POST_VIEW_SELECT);
    let view = sqlx::query_as::<_, PostView>(&sql)
        .bind(viewer_id)
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    Ok(view.map(with_avatar))
}

/// Users whose nickname is exactly `nickname`. Empty when nothing matches.
pub async fn search_users_exact(
    pool: &SqlitePool,
    nickname: &str,
    limit: u32,
) -> Result<Vec<User>, AppError> {
    let sql = format!(
        "SELECT {} FROM users WHERE nickname = $1 ORDER BY id LIMIT $2",
        USER_COLUMNS
    );
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(nickname)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;
    Ok(users)
}

async fn target_by_nickname(pool: &SqlitePool, nickname: &str) -> Result<User, AppError> {
    users::find_by_nickname(pool, nickname)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found.", nickname)))
}

/// Follows the user called `nickname`. Returns the target and whether a new edge was made.
pub async fn follow_user(pool: &SqlitePool, me: &User, nickname: &str) -> Result<(User, bool), AppError> {
    let target = target_by_nickname(pool, nickname).await?;
    if target.id == me.id {
        return Err(AppError::Validation("You can't follow yourself!".to_string()));
    }

    let created = users::follow(pool, me.id, target.id).await?;
    if created {
        tracing::info!(follower = %me.nickname, followed = %target.nickname, "New follow");
    }
    Ok((target, created))
}

/// Unfollows the user called `nickname`. Returns the target and whether an edge was removed.
pub async fn unfollow_user(pool: &SqlitePool, me: &User, nickname: &str) -> Result<(User, bool), AppError> {
    let target = target_by_nickname(pool, nickname).await?;
    if target.id == me.id {
        return Err(AppError::Validation("You can't unfollow yourself!".to_string()));
    }

    let removed = users::unfollow(pool, me.id, target.id).await?;
    Ok((target, removed))
}

/// Public profile of `nickname` as seen by `viewer`.
pub async fn profile(pool: &SqlitePool, viewer: Option<&User>, nickname: &str) -> Result<ProfileView, AppError> {
    let user = target_by_nickname(pool, nickname).await?;

    let is_following = match viewer {
        Some(viewer) if viewer.id != user.id => users::is_following(pool, viewer.id, user.id).await?,
        _ => false,
    };

    Ok(ProfileView {
        id: user.id,
        avatar: avatar::gravatar_url(&user.email, avatar::DEFAULT_SIZE),
        followers_count: users::followers_count(pool, user.id).await?,
        following_count: users::following_count(pool, user.id).await?,
        is_following,
        nickname: user.nickname,
        about_me: user.about_me,
        last_seen: user.last_seen,
    })
}
