//! Application state, configuration and the health endpoint.

use std::env;
use std::sync::Arc;

use axum::Json;
use chrono::Duration;
use thiserror::Error;

use crate::infrastructure::{
    CategoryRepository, PasswordHasher, Repositories, SessionRepository, TaskRepository,
    UserRepository,
};

// =============================================================================
// Application Configuration
// =============================================================================

/// Request-handling settings, read once at startup.
///
/// - `SESSION_TTL_SECONDS`: session lifetime (default two weeks, at most ten years)
/// - `SECURE_COOKIES`: `true`/`1`/`yes` marks cookies `Secure` (default off)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Number of tasks per list page.
    pub page_size: u32,
    /// How long a login session stays valid.
    pub session_ttl: Duration,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            session_ttl: Duration::seconds(Self::DEFAULT_SESSION_TTL_SECONDS),
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    /// Two weeks.
    pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 1_209_600;

    /// Ten years.
    pub const MAX_SESSION_TTL_SECONDS: i64 = 315_360_000;

    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppConfigError` if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, AppConfigError> {
        let defaults = Self::default();

        let session_ttl = match env::var("SESSION_TTL_SECONDS") {
            Ok(value) => parse_session_ttl(&value)?,
            Err(_) => defaults.session_ttl,
        };

        let secure_cookies = match env::var("SECURE_COOKIES") {
            Ok(value) => parse_flag(&value)?,
            Err(_) => defaults.secure_cookies,
        };

        Ok(Self {
            session_ttl,
            secure_cookies,
            ..defaults
        })
    }
}

fn parse_session_ttl(value: &str) -> Result<Duration, AppConfigError> {
    match value.trim().parse::<i64>() {
        Ok(seconds) if seconds > 0 && seconds <= AppConfig::MAX_SESSION_TTL_SECONDS => {
            Ok(Duration::seconds(seconds))
        }
        _ => Err(AppConfigError::InvalidSessionTtl(value.to_string())),
    }
}

fn parse_flag(value: &str) -> Result<bool, AppConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(AppConfigError::InvalidSecureCookies(value.to_string())),
    }
}

/// Errors raised while reading the application configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppConfigError {
    /// `SESSION_TTL_SECONDS` is not a positive integer.
    #[error("Invalid SESSION_TTL_SECONDS: '{0}'. Expected a positive number of seconds")]
    InvalidSessionTtl(String),

    /// `SECURE_COOKIES` is not a boolean.
    #[error("Invalid SECURE_COOKIES: '{0}'. Expected 'true' or 'false'")]
    InvalidSecureCookies(String),
}

// =============================================================================
// Application State
// =============================================================================

/// Everything a handler reaches through `State`. Clones share the
/// repositories.
#[derive(Clone)]
pub struct AppState {
    pub task_repository: Arc<dyn TaskRepository + Send + Sync>,
    pub category_repository: Arc<dyn CategoryRepository + Send + Sync>,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub session_repository: Arc<dyn SessionRepository + Send + Sync>,
    pub password_hasher: PasswordHasher,
    pub config: AppConfig,
}

impl AppState {
    /// State with default settings, as used by tests.
    #[must_use]
    pub fn from_repositories(repositories: Repositories) -> Self {
        Self::with_config(repositories, AppConfig::default())
    }

    #[must_use]
    pub fn with_config(repositories: Repositories, config: AppConfig) -> Self {
        Self {
            task_repository: repositories.task_repository,
            category_repository: repositories.category_repository,
            user_repository: repositories.user_repository,
            session_repository: repositories.session_repository,
            password_hasher: PasswordHasher::new(),
            config,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// GET /health
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe: `{"status": "healthy", "version": <crate version>}`.
/// Needs no session and touches no storage.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.session_ttl, Duration::weeks(2));
        assert!(!config.secure_cookies);
    }

    #[rstest]
    #[case("3600", Ok(Duration::hours(1)))]
    #[case("0", Err(AppConfigError::InvalidSessionTtl("0".to_string())))]
    #[case("-5", Err(AppConfigError::InvalidSessionTtl("-5".to_string())))]
    #[case(
        "9999999999999",
        Err(AppConfigError::InvalidSessionTtl("9999999999999".to_string()))
    )]
    #[case("soon", Err(AppConfigError::InvalidSessionTtl("soon".to_string())))]
    fn test_parse_session_ttl(
        #[case] input: &str,
        #[case] expected: Result<Duration, AppConfigError>,
    ) {
        assert_eq!(parse_session_ttl(input), expected);
    }

    #[rstest]
    #[case("true", Ok(true))]
    #[case("YES", Ok(true))]
    #[case("1", Ok(true))]
    #[case("false", Ok(false))]
    #[case("", Ok(false))]
    #[case("maybe", Err(AppConfigError::InvalidSecureCookies("maybe".to_string())))]
    fn test_parse_flag(#[case] input: &str, #[case] expected: Result<bool, AppConfigError>) {
        assert_eq!(parse_flag(input), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_health_check() {
        let Json(response) = health_check().await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    }

    #[rstest]
    fn test_app_state_debug_hides_repositories() {
        let state = AppState::from_repositories(Repositories::in_memory());
        let debug = format!("{state:?}");
        assert!(debug.contains("AppState"));
        assert!(!debug.contains("task_repository"));
    }
}
