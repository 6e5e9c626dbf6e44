// src/db/users.rs
//
// Identity & profile store: users and the follow relation.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

use super::USER_COLUMNS;
use crate::{
    error::{AppError, is_foreign_key_violation, is_unique_violation, violated_column},
    models::user::{UpdateProfileRequest, User},
    utils::nickname,
};

/// How many times account creation re-resolves a nickname that a concurrent
/// request claimed between our check and our insert. Every round lets at least
/// one contender through, so this bounds the number of simultaneous signups
/// sharing one base nickname.
const MAX_CREATE_ATTEMPTS: u32 = 32;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_nickname(pool: &SqlitePool, nickname: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM users WHERE nickname = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(nickname)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Creates an account from the identity provider's data.
///
/// The nickname is derived from `nickname_hint` (or the email) and suffixed with
/// the first free integer starting at 2 on collision. The user row and its
/// self-follow row are written in one transaction.
///
/// The nickname is resolved on the pool before the transaction opens, so the
/// transaction's first statement is a write. SQLite cannot upgrade a deferred
/// read transaction to a write while another writer is active; it fails with
/// SQLITE_BUSY instead of waiting on the busy timeout.
pub async fn create_user(
    pool: &SqlitePool,
    nickname_hint: Option<&str>,
    email: &str,
) -> Result<User, AppError> {
    // Fast path only; the UNIQUE constraint below is what actually guarantees it.
    if find_by_email(pool, email).await?.is_some() {
        return Err(email_taken(email));
    }

    let base = nickname::base_nickname(nickname_hint, email);
    let insert_sql = format!(
        "INSERT INTO users (nickname, email) VALUES ($1, $2) RETURNING {}",
        USER_COLUMNS
    );

    for _ in 0..MAX_CREATE_ATTEMPTS {
        let candidate = unique_nickname(pool, &base).await?;
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query_as::<_, User>(&insert_sql)
            .bind(&candidate)
            .bind(email)
            .fetch_one(&mut *tx)
            .await;

        let user = match inserted {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                if violated_column(&e).as_deref() == Some("email") {
                    return Err(email_taken(email));
                }
                tracing::warn!(nickname = %candidate, "Nickname claimed concurrently, retrying");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        // Self-follow: the feed join relies on it to include the user's own posts.
        insert_follow(&mut tx, user.id, user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, nickname = %user.nickname, "Created user");
        return Ok(user);
    }

    Err(AppError::Conflict(
        "Could not allocate a unique nickname, please try again.".to_string(),
    ))
}

/// First free nickname among `base`, `base2`, `base3`, ...
async fn unique_nickname(pool: &SqlitePool, base: &str) -> Result<String, AppError> {
    let mut attempt = 1;
    loop {
        let candidate = nickname::candidate(base, attempt);
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE nickname = $1)")
            .bind(&candidate)
            .fetch_one(pool)
            .await?;
        if !taken {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

fn email_taken(email: &str) -> AppError {
    AppError::Conflict(format!("An account for '{}' already exists", email))
}

fn nickname_taken(nickname: &str) -> AppError {
    AppError::Conflict(format!(
        "The nickname '{}' is already in use. Please choose another one.",
        nickname
    ))
}

/// Edits nickname and about-me.
///
/// A changed nickname must be in sanitized form and unused by any other user.
/// Nothing is written if validation fails.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    payload: &UpdateProfileRequest,
) -> Result<User, AppError> {
    payload.validate()?;

    let current = find_by_id(pool, user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if payload.nickname != current.nickname {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE nickname = $1 AND id != $2)",
        )
        .bind(&payload.nickname)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(nickname_taken(&payload.nickname));
        }
    }

    let sql = format!(
        "UPDATE users SET nickname = $1, about_me = $2 WHERE id = $3 RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.nickname)
        .bind(&payload.about_me)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                nickname_taken(&payload.nickname)
            } else {
                AppError::from(e)
            }
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(user)
}

/// Adds `follower_id -> followed_id`. Returns false if the edge already existed.
///
/// Self-follows are accepted here; rejecting them as a user action is the
/// caller's job (see `db::feed::follow_user`).
pub async fn follow(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<bool, AppError> {
    let mut conn = pool.acquire().await?;
    insert_follow(&mut conn, follower_id, followed_id).await
}

async fn insert_follow(
    conn: &mut SqliteConnection,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO followers (follower_id, followed_id)
        VALUES ($1, $2)
        ON CONFLICT (follower_id, followed_id) DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::NotFound("User not found".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok(result.rows_affected() == 1)
}

/// Removes `follower_id -> followed_id`. Returns false if there was nothing to remove.
pub async fn unfollow(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM followers WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_following(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<bool, AppError> {
    let following: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM followers WHERE follower_id = $1 AND followed_id = $2)",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await?;
    Ok(following)
}

/// Number of users following `user_id`, not counting themselves.
pub async fn followers_count(pool: &SqlitePool, user_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM followers WHERE followed_id = $1 AND follower_id != $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Number of users `user_id` follows, not counting themselves.
pub async fn following_count(pool: &SqlitePool, user_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM followers WHERE follower_id = $1 AND followed_id != $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn touch_last_seen(pool: &SqlitePool, user_id: i64, time: DateTime<Utc>) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_seen = $1 WHERE id = $2")
        .bind(time)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Deletes an account together with its posts, hearts and follow edges.
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    // Hearts on the user's posts go first so nothing depends on ON DELETE CASCADE alone.
    sqlx::query(
        r#"
        DELETE FROM post_hearts
        WHERE user_id = $1 OR post_id IN (SELECT id FROM posts WHERE user_id = $1)
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM posts WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM followers WHERE follower_id = $1 OR followed_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tx.commit().await?;
    tracing::info!(user_id, "Deleted user");
    Ok(())
}
