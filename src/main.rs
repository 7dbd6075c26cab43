// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowlane_auth::auth;
use flowlane_auth::common::AppState;
use flowlane_auth::logging_middleware;
use flowlane_auth::services::identity::{IdentityProvider, RestIdentityProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let identity_api_url =
        env::var("IDENTITY_API_URL").unwrap_or_else(|_| "https://identity.flowlane.dev".to_string());
    let identity_api_key = env::var("IDENTITY_API_KEY").unwrap_or_default();
    if identity_api_key.is_empty() {
        warn!("IDENTITY_API_KEY is not set; provider calls will be rejected upstream");
    }

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(RestIdentityProvider::new(identity_api_url, identity_api_key));
    info!("Identity provider client initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState { identity };
    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer({
            // Get CORS origins from environment variable
            let cors_origins = env::var("CORS_ORIGINS").unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:5173".to_string()
            });

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
