// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::nickname::validate_nickname;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct User {
    pub id: i64,

    /// Unique handle, restricted to letters, digits, '.' and '_'.
    pub nickname: String,

    /// Verified address from the identity provider.
    /// Skipped during serialization; only the owner sees it (see `MeResponse`).
    #[serde(skip)]
    pub email: String,

    pub about_me: Option<String>,

    pub last_seen: Option<DateTime<Utc>>,
}

/// Public profile of a user as seen by a (possibly anonymous) viewer.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub nickname: String,
    pub about_me: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub avatar: String,
    /// Excludes the self-follow row.
    pub followers_count: i64,
    /// Excludes the self-follow row.
    pub following_count: i64,
    /// Whether the viewer follows this user. Always false for anonymous viewers.
    pub is_following: bool,
}

/// The current user's own profile, including private fields.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub about_me: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub avatar: String,
}

/// Verified identity assertion handed over by the identity provider.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Taken as the provider reports it; only presence and length are checked.
    #[validate(length(
        min = 1,
        max = 120,
        message = "An email of at most 120 characters is required to log in."
    ))]
    pub email: String,

    /// Suggested display name; sanitized before use.
    pub nickname: Option<String>,
}

/// DTO for editing the current user's profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 1, max = 64, message = "Nickname length must be between 1 and 64 characters."),
        custom(function = validate_nickname)
    )]
    pub nickname: String,

    #[validate(length(max = 140, message = "About me must be at most 140 characters."))]
    pub about_me: Option<String>,
}

/// Query parameters for user search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}
