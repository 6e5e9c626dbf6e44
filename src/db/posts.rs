// src/db/posts.rs
//
// Post store: posts and the heart relation.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::{
        page::{Page, PageRequest},
        post::Post,
    },
};

pub const MAX_POST_LEN: usize = 140;

pub async fn create_post(
    pool: &SqlitePool,
    author_id: i64,
    body: &str,
    time: DateTime<Utc>,
) -> Result<Post, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::Validation("Post body cannot be blank.".to_string()));
    }
    if body.chars().count() > MAX_POST_LEN {
        return Err(AppError::Validation(format!(
            "Post length must be between 1 and {} characters.",
            MAX_POST_LEN
        )));
    }

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (body, timestamp, user_id)
        VALUES ($1, $2, $3)
        RETURNING id, body, timestamp, user_id
        "#,
    )
    .bind(body)
    .bind(time)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::NotFound("User not found".to_string())
        } else {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok(post)
}

pub async fn get_post(pool: &SqlitePool, post_id: i64) -> Result<Option<Post>, AppError> {
    let post = sqlx::query_as::<_, Post>("SELECT id, body, timestamp, user_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    Ok(post)
}

/// Deletes a post and its hearts. Only the author may do this.
pub async fn delete_post(pool: &SqlitePool, post_id: i64, requester_id: i64) -> Result<(), AppError> {
    // The author check lives in the WHERE clauses so the first statement of the
    // transaction is already a write.
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM post_hearts
        WHERE post_id IN (SELECT id FROM posts WHERE id = $1 AND user_id = $2)
        "#,
    )
    .bind(post_id)
    .bind(requester_id)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(requester_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        // Nothing was written; dropping the transaction rolls it back.
        drop(tx);
        return match get_post(pool, post_id).await? {
            Some(_) => Err(AppError::Forbidden(
                "You are not authorized to delete this post".to_string(),
            )),
            None => Err(AppError::NotFound("Post not found".to_string())),
        };
    }

    tx.commit().await?;
    tracing::info!(post_id, author_id = requester_id, "Deleted post");
    Ok(())
}

/// An author's posts, most recent first.
pub async fn list_posts_by_author(
    pool: &SqlitePool,
    author_id: i64,
    page: PageRequest,
) -> Result<Page<Post>, AppError> {
    let rows = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, body, timestamp, user_id
        FROM posts
        WHERE user_id = $1
        ORDER BY timestamp DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(author_id)
    .bind(page.fetch_limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::from_overfetch(rows, page))
}

/// Hearts a post. Returns false if the user had already hearted it.
pub async fn heart(pool: &SqlitePool, user_id: i64, post_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO post_hearts (user_id, post_id, timestamp)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, post_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::NotFound("Post not found".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok(result.rows_affected() == 1)
}

/// Removes a heart. Returns false if there was none.
pub async fn unheart(pool: &SqlitePool, user_id: i64, post_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM post_hearts WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn did_heart(pool: &SqlitePool, user_id: i64, post_id: i64) -> Result<bool, AppError> {
    let hearted: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM post_hearts WHERE user_id = $1 AND post_id = $2)",
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_one(pool)
    .await?;
    Ok(hearted)
}

pub async fn heart_count(pool: &SqlitePool, post_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_hearts WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
