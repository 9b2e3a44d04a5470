//! Web server for Aegis.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::SessionRepository;
use crate::{AegisError, Database};

use super::cookie::CookieSettings;
use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::create_router;

/// Interval of the expired-session sweep.
const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Rate limiters, when enabled.
    rate_limits: Option<Arc<RateLimitState>>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server over `db`.
    pub fn new(config: &Config, db: Database) -> crate::Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| AegisError::Config(format!("invalid server address: {e}")))?;

        let auth = AuthService::new(db, &config.auth)?;
        let app_state = AppState::new(
            auth,
            config.navigation.clone(),
            CookieSettings::from_config(&config.auth),
        );

        let rate_limits = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimitState::new(&config.rate_limit)));

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            rate_limits,
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the application router.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.rate_limits.clone(),
            &self.cors_origins,
        )
    }

    /// Start the expired-session sweep.
    ///
    /// Runs every hour and deactivates sessions past their expiry.
    fn start_session_sweep_task(db: Database) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match SessionRepository::new(db.pool()).cleanup_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deactivated_count = count, "Deactivated expired sessions");
                    }
                    Ok(_) => tracing::debug!("No expired sessions to deactivate"),
                    Err(e) => tracing::warn!(error = %e, "Failed to sweep expired sessions"),
                }
            }
        });
    }

    /// Run the web server.
    pub async fn run(self) -> crate::Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_sweep_task(self.app_state.auth.db().clone());
        tracing::info!("Session sweep task started (runs every hour)");
        if let Some(limits) = self.rate_limits {
            limits.start_cleanup_task();
        }

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.auth.jwt_secret = "server-test-secret-0123456789".to_string();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let db = Database::open_in_memory().await.unwrap();
        let server = WebServer::new(&create_test_config(), db).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
        assert!(server.rate_limits.is_some());
    }

    #[tokio::test]
    async fn test_rate_limits_can_be_disabled() {
        let mut config = create_test_config();
        config.rate_limit.enabled = false;
        let db = Database::open_in_memory().await.unwrap();
        let server = WebServer::new(&config, db).unwrap();
        assert!(server.rate_limits.is_none());
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let mut config = create_test_config();
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();
        assert!(matches!(
            WebServer::new(&config, db),
            Err(AegisError::Config(_))
        ));
    }
}
