pub mod api;
pub mod auth;
pub mod cli;
pub mod credentials;
pub mod db;
pub mod jwt;
pub mod keys;
pub mod lookup;
pub mod session;
pub mod validation;
pub mod web;

use api::create_api_router;
use auth::CookieSettings;
use axum::Router;
use db::Database;
use jwt::TokenCodec;
use lookup::NumberLookup;
use session::{SessionConfig, SessionService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use web::create_web_router;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token issuer and verifier, built from the configured key pairs
    pub codec: Arc<TokenCodec>,
    /// Store timeout and password hashing cost
    pub session: SessionConfig,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Phone number classification backend
    pub lookup: Arc<dyn NumberLookup>,
}

impl ServerConfig {
    /// Session service backed by the configured database.
    pub fn session_service(&self) -> SessionService {
        SessionService::new(
            Arc::new(self.db.users()),
            self.codec.clone(),
            self.session,
        )
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let cookies = CookieSettings::new(config.secure_cookies, config.codec.lifetimes());
    let session = config.session_service();

    let api_router = create_api_router(
        config.db.clone(),
        session.clone(),
        config.lookup.clone(),
        cookies,
    );

    let web_router = create_web_router(config.db.clone(), session, config.lookup.clone(), cookies);

    Router::new().nest("/api", api_router).merge(web_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
