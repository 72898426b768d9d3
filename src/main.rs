//! Business Directory Backend
//!
//! REST backend for listing businesses, rating and commenting on them, and
//! following other users, with SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Business Directory Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No gateway key configured (BIZDIR_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Users
        .route("/users", get(api::list_users))
        .route("/users/register", post(api::register_user))
        .route("/users/login", post(api::login_user))
        .route("/users/profile", put(api::update_profile))
        .route("/users/profile/posts", get(api::get_own_posts))
        .route("/users/profile/saved", get(api::get_saved_businesses))
        .route("/users/save/{business_id}", put(api::save_business))
        .route("/users/unsave/{business_id}", put(api::unsave_business))
        .route("/users/{user}", get(api::get_user_profile))
        .route("/users/{user}/follow", put(api::follow_user))
        .route("/users/{user}/unfollow", put(api::unfollow_user))
        // Businesses
        .route(
            "/businesses",
            get(api::list_businesses).post(api::create_business),
        )
        .route(
            "/businesses/{id}",
            get(api::get_business)
                .put(api::update_business)
                .delete(api::delete_business),
        )
        .route("/businesses/{id}/like", put(api::like_business))
        .route(
            "/businesses/{id}/comments",
            get(api::list_comments).post(api::add_comment),
        )
        .route("/businesses/{id}/ratings", post(api::rate_business))
        .route("/businesses/{id}/ratings/{user_id}", get(api::get_rating))
        // Comments
        .route("/comments/{id}", get(api::get_comment))
        // Gateway key check
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// CORS for the single-page client: one origin when configured, any otherwise.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin.map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => layer.allow_origin(AllowOrigin::exact(origin)),
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid BIZDIR_CORS_ORIGIN: {}", e);
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
