// src/db/mod.rs
//
// Storage layer: every function takes the pool, owns its own transaction when it
// writes more than one row, and returns `AppError`.

use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod feed;
pub mod posts;
pub mod users;

/// Column list matching `models::user::User`.
pub(crate) const USER_COLUMNS: &str = "id, nickname, email, about_me, last_seen";

/// Opens (creating if needed) the SQLite database and applies migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        // Writers queue behind each other instead of failing with SQLITE_BUSY.
        .busy_timeout(Duration::from_secs(5));

    // In-memory databases live and die with their connection, so never recycle it.
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

    Ok(pool)
}
