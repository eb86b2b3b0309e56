//! Infrastructure module for external services.
//!
//! This module contains the repository traits and their in-memory and
//! `PostgreSQL` implementations, the repository factory, and password hashing.

pub mod factory;
pub mod in_memory;
pub mod password;
pub mod postgres;
pub mod repository;

pub use factory::{
    ConfigurationError, FactoryError, Repositories, RepositoryConfig, RepositoryFactory,
    StorageMode,
};
pub use in_memory::{
    InMemoryCategoryRepository, InMemoryDatabase, InMemorySessionRepository,
    InMemoryTaskRepository, InMemoryUserRepository,
};
pub use password::{PasswordError, PasswordHasher};
pub use postgres::{
    PostgresCategoryRepository, PostgresSessionRepository, PostgresTaskRepository,
    PostgresUserRepository,
};
pub use repository::{
    CategoryDeletion, CategoryRepository, PaginatedResult, Pagination, RepositoryError,
    SessionRepository, TaskRepository, UserRepository,
};
