pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod session;

use api::create_api_router;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use db::Database;
use jwt::JwtConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::warn;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens (independent of the access secret)
    pub refresh_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds (also the cookie Max-Age)
    pub refresh_ttl_secs: u64,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Allowed cross-origin hosts
    pub cors_origins: Vec<String>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        &config.access_secret,
        &config.refresh_secret,
        config.access_ttl_secs,
        config.refresh_ttl_secs,
    ));

    let api_router = create_api_router(config.db.clone(), jwt, config.secure_cookies);

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer(&config.cors_origins))
}

/// Build the CORS layer from the configured allowlist. Credentials are
/// allowed so the refresh cookie survives cross-origin calls.
fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(parse_origins(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Parse the allowlist into header values, warning about entries that
/// cannot be used so a misconfigured origin does not vanish silently.
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_keeps_valid_and_drops_invalid() {
        let origins = vec![
            "http://localhost:5173".to_string(),
            "http://bad\norigin".to_string(),
            "https://app.example.com".to_string(),
        ];

        let parsed = parse_origins(&origins);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], "http://localhost:5173");
        assert_eq!(parsed[1], "https://app.example.com");
    }
}
