// src/main.rs

use std::sync::Arc;

use microblog::config::Config;
use microblog::db;
use microblog::routes;
use microblog::state::AppState;
use microblog::utils::notify::LogNotifier;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Open the database and run migrations
    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database ready, migrations applied.");

    let state = AppState {
        pool,
        config: config.clone(),
        notifier: Arc::new(LogNotifier),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("microblog startup, listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
