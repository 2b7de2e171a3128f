//! Research Projects Backend
//!
//! REST backend for research projects, their collaborators, user accounts and
//! project notification emails, persisted in SQLite or PostgreSQL.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod mail;
mod models;

use std::any::Any;
use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, DatabaseConfig, LogFormat};
use db::Repository;
use errors::AppError;
use mail::{Mailer, SmtpMailer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    /// `None` when no SMTP credentials are configured
    pub mailer: Option<Arc<dyn Mailer>>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load and validate configuration
    let config = Config::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting Research Projects Backend");
    match &config.database {
        DatabaseConfig::Sqlite { path } => tracing::info!("Database: sqlite at {:?}", path),
        DatabaseConfig::Postgres { .. } => tracing::info!("Database: postgresql"),
    }
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.database, config.max_connections).await?;
    let repo = Arc::new(Repository::new(pool));

    if let Some(seed) = &config.admin_seed {
        if auth::seed_user(&repo, &seed.username, &seed.password).await? {
            tracing::info!("Created seed user {:?}", seed.username);
        }
    }

    let mailer: Option<Arc<dyn Mailer>> = match &config.email {
        Some(email) => Some(Arc::new(SmtpMailer::new(email)?)),
        None => {
            tracing::warn!("EMAIL_ADDRESS/EMAIL_PASSWORD not set. Email sending is disabled!");
            None
        }
    };

    // Create application state
    let state = AppState {
        repo,
        mailer,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    // API routes
    let api_routes = Router::new()
        // Projects
        .route("/projects", get(api::list_projects))
        .route("/projects", post(api::create_project))
        .route("/projects/{id}", get(api::get_project))
        .route("/projects/{id}", put(api::update_project))
        .route("/projects/{id}", delete(api::delete_project))
        // Collaborators
        .route("/projects/{id}/collaborators", get(api::list_collaborators))
        .route("/projects/{id}/collaborators", post(api::add_collaborator))
        .route("/collaborators", get(api::list_all_collaborators))
        .route("/collaborators", post(api::assign_collaborator))
        .route("/collaborators/{id}", delete(api::delete_collaborator))
        // Accounts
        .route("/register", post(api::register))
        .route("/login", post(api::login))
        .route("/change-password", post(api::change_password))
        // Email
        .route("/send-email", post(api::send_email));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(api::health_check))
        .fallback(api::route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(cors),
        )
        .with_state(state)
}

/// Turn a handler panic into the standard 500 envelope.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!("Handler panicked: {}", detail);
    AppError::Internal(detail).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
