use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Post {
    pub id: i64,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// Author. Immutable after creation.
    pub user_id: i64,
}

/// A post joined with its author and heart state, as listed in feeds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostView {
    pub id: i64,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub author_nickname: String,

    #[serde(skip)]
    pub author_email: String,

    /// Filled in after the query from `author_email`.
    #[sqlx(skip)]
    pub author_avatar: String,

    pub hearts_count: i64,

    /// UI helper: whether the viewer has hearted this post.
    /// Always false for anonymous viewers.
    pub hearted: bool,
}

/// DTO for publishing a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(
        length(
            min = 1,
            max = 140,
            message = "Post length must be between 1 and 140 characters."
        ),
        custom(function = validate_not_blank)
    )]
    pub body: String,
}

fn validate_not_blank(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        let mut err = ValidationError::new("blank_post");
        err.message = Some("Post body cannot be blank.".into());
        return Err(err);
    }
    Ok(())
}

/// Response for heart/unheart.
#[derive(Debug, Serialize)]
pub struct HeartResponse {
    pub post_id: i64,
    pub hearted: bool,
    pub hearts_count: i64,
}
