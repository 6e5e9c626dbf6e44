// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{self, auth, community, interaction, profile, users},
    state::AppState,
    utils::session::{require_login, session_middleware},
};

/// Assembles the main application router.
///
/// * Public routes see a `CurrentUser` that may be `Anonymous`.
/// * Protected routes additionally get the logged-in `User`.
/// * Global middleware: session resolution, CORS, request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/session", get(auth::session))
        .route("/posts/{id}", get(community::get_post))
        .route("/users/{nickname}", get(users::get_user))
        .route("/users/{nickname}/posts", get(users::list_user_posts))
        .route("/search", get(users::search));

    let protected_routes = Router::new()
        .route("/feed", get(community::get_feed))
        .route("/posts", post(community::create_post))
        .route("/posts/{id}", delete(community::delete_post))
        .route(
            "/posts/{id}/heart",
            post(interaction::heart_post).delete(interaction::unheart_post),
        )
        .route(
            "/users/{nickname}/follow",
            post(interaction::follow).delete(interaction::unfollow),
        )
        .route(
            "/profile",
            get(profile::get_me)
                .put(profile::update_me)
                .delete(profile::delete_me),
        )
        .route_layer(middleware::from_fn(require_login));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .fallback(handlers::not_found)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
