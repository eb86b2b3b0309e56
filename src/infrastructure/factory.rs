//! Backend selection and repository wiring.
//!
//! The server reads which store to use from the process environment, then
//! hands the resulting [`RepositoryConfig`] to [`RepositoryFactory`] to obtain
//! one [`Repositories`] bundle shared by every request.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `STORAGE_MODE` | `in_memory` or `postgres` | `in_memory` |
//! | `DATABASE_URL` | connection string for `postgres` mode | none |
//! | `DATABASE_MAX_CONNECTIONS` | pool size for `postgres` mode | 10 |
//!
//! ```ignore
//! let repositories = RepositoryFactory::new(RepositoryConfig::from_env()?)
//!     .create()
//!     .await?;
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use super::{
    CategoryRepository, InMemoryDatabase, PostgresCategoryRepository, PostgresSessionRepository,
    PostgresTaskRepository, PostgresUserRepository, SessionRepository, TaskRepository,
    UserRepository,
};

const STORAGE_MODE_VAR: &str = "STORAGE_MODE";
const DATABASE_URL_VAR: &str = "DATABASE_URL";
const MAX_CONNECTIONS_VAR: &str = "DATABASE_MAX_CONNECTIONS";

// =============================================================================
// Configuration
// =============================================================================

/// Which store backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Process-local tables; contents vanish on restart.
    #[default]
    InMemory,
    /// A `PostgreSQL` database, migrated on startup.
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        if matches!(normalized.as_str(), "in_memory" | "inmemory" | "memory") {
            Ok(Self::InMemory)
        } else if matches!(normalized.as_str(), "postgres" | "postgresql" | "pg") {
            Ok(Self::Postgres)
        } else {
            Err(ConfigurationError::UnknownStorageMode(value.to_string()))
        }
    }
}

/// Settings for [`RepositoryFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub storage_mode: StorageMode,
    /// Only consulted in `Postgres` mode.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl RepositoryConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    /// Settings for the in-memory store.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            storage_mode: StorageMode::InMemory,
            database_url: None,
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Settings for a `PostgreSQL` store at `database_url`.
    #[must_use]
    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self {
            storage_mode: StorageMode::Postgres,
            database_url: Some(database_url.into()),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Overrides the pool size.
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Fails on an unrecognised `STORAGE_MODE`, a pool size that is not a
    /// positive integer, or `postgres` mode without a `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the settings from any variable source.
    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let storage_mode = lookup(STORAGE_MODE_VAR)
            .map(|raw| raw.parse::<StorageMode>())
            .transpose()?
            .unwrap_or_default();

        // A blank URL counts as missing.
        let database_url = lookup(DATABASE_URL_VAR)
            .map(|raw| raw.trim().to_owned())
            .filter(|url| !url.is_empty());

        let max_connections = lookup(MAX_CONNECTIONS_VAR)
            .map(|raw| parse_pool_size(&raw))
            .transpose()?
            .unwrap_or(Self::DEFAULT_MAX_CONNECTIONS);

        let config = Self {
            storage_mode,
            database_url,
            max_connections,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings are usable together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DatabaseUrlRequired`] for `Postgres`
    /// without a URL and [`ConfigurationError::InvalidPoolSize`] for a zero
    /// pool.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::InvalidPoolSize("0".to_owned()));
        }
        match (self.storage_mode, &self.database_url) {
            (StorageMode::Postgres, None) => Err(ConfigurationError::DatabaseUrlRequired),
            _ => Ok(()),
        }
    }
}

fn parse_pool_size(raw: &str) -> Result<u32, ConfigurationError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| ConfigurationError::InvalidPoolSize(raw.to_owned()))
}

// =============================================================================
// Errors
// =============================================================================

/// A storage setting that cannot be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown STORAGE_MODE {0:?}; use \"in_memory\" or \"postgres\"")]
    UnknownStorageMode(String),

    #[error("DATABASE_MAX_CONNECTIONS must be a positive integer, got {0:?}")]
    InvalidPoolSize(String),

    #[error("STORAGE_MODE=postgres needs DATABASE_URL to be set")]
    DatabaseUrlRequired,
}

/// Failure while bringing the storage backend up.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("invalid storage settings: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("could not connect to PostgreSQL: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("could not apply migrations: {0}")]
    Migrate(#[source] sqlx::migrate::MigrateError),
}

// =============================================================================
// Repositories
// =============================================================================

/// The four repositories handed to request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub task_repository: Arc<dyn TaskRepository + Send + Sync>,
    pub category_repository: Arc<dyn CategoryRepository + Send + Sync>,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub session_repository: Arc<dyn SessionRepository + Send + Sync>,
}

impl Repositories {
    /// Repositories over one fresh set of in-memory tables, so category
    /// deletes cascade into the task table they share.
    #[must_use]
    pub fn in_memory() -> Self {
        let tables = InMemoryDatabase::new();
        Self {
            task_repository: Arc::new(tables.task_repository()),
            category_repository: Arc::new(tables.category_repository()),
            user_repository: Arc::new(tables.user_repository()),
            session_repository: Arc::new(tables.session_repository()),
        }
    }

    /// Repositories sharing `pool`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            task_repository: Arc::new(PostgresTaskRepository::new(pool.clone())),
            category_repository: Arc::new(PostgresCategoryRepository::new(pool.clone())),
            user_repository: Arc::new(PostgresUserRepository::new(pool.clone())),
            session_repository: Arc::new(PostgresSessionRepository::new(pool.clone())),
        }
    }
}

impl fmt::Debug for Repositories {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Repositories").finish_non_exhaustive()
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Turns a [`RepositoryConfig`] into live [`Repositories`].
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    config: RepositoryConfig,
}

impl RepositoryFactory {
    #[must_use]
    pub const fn new(config: RepositoryConfig) -> Self {
        Self { config }
    }

    /// Shorthand for `RepositoryFactory::new(RepositoryConfig::from_env()?)`.
    ///
    /// # Errors
    ///
    /// Propagates the environment's [`ConfigurationError`].
    pub fn from_env() -> Result<Self, FactoryError> {
        Ok(Self::new(RepositoryConfig::from_env()?))
    }

    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Opens the configured backend. `Postgres` mode connects a pool and
    /// runs the embedded migrations first.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError`] when the settings are unusable, the database
    /// is unreachable, or a migration fails.
    pub async fn create(&self) -> Result<Repositories, FactoryError> {
        self.config.validate()?;
        let Some(database_url) = self.postgres_url() else {
            return Ok(Repositories::in_memory());
        };

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .connect(database_url)
            .await
            .map_err(FactoryError::Connect)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(FactoryError::Migrate)?;
        tracing::info!(
            max_connections = self.config.max_connections,
            "PostgreSQL storage ready"
        );

        Ok(Repositories::postgres(&pool))
    }

    fn postgres_url(&self) -> Option<&str> {
        match self.config.storage_mode {
            StorageMode::InMemory => None,
            StorageMode::Postgres => self.config.database_url.as_deref(),
        }
    }
}
