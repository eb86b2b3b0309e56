//! `PostgreSQL` repository implementations.
//!
//! This module provides `PostgreSQL`-based implementations of the repository
//! traits using `sqlx` with parameterized queries. The schema is applied by
//! the embedded migrations in `migrations/` when the factory connects.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     uuid UUID NOT NULL UNIQUE,
//!     username VARCHAR(150) NOT NULL UNIQUE,
//!     email VARCHAR(254),
//!     password_hash TEXT NOT NULL,
//!     date_joined TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE sessions (
//!     token VARCHAR(64) PRIMARY KEY,
//!     user_uuid UUID NOT NULL REFERENCES users (uuid) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE category (
//!     id BIGSERIAL PRIMARY KEY,
//!     uuid UUID NOT NULL UNIQUE,
//!     name VARCHAR(200) NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE task (
//!     id BIGSERIAL PRIMARY KEY,
//!     uuid UUID NOT NULL UNIQUE,
//!     title VARCHAR(200) NOT NULL,
//!     description TEXT,
//!     complete BOOLEAN NOT NULL DEFAULT FALSE,
//!     due TIMESTAMPTZ,
//!     priority VARCHAR(6) NOT NULL DEFAULT 'low',
//!     category_uuid UUID REFERENCES category (uuid) ON DELETE CASCADE,
//!     owner_uuid UUID REFERENCES users (uuid) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX idx_task_title ON task (title);
//! ```
//!
//! The `id` columns are internal row numbers; only `uuid` values ever leave
//! this module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Category, CategoryId, Session, SessionToken, Task, TaskId, Timestamp, User, UserId,
};
use crate::infrastructure::{
    CategoryDeletion, CategoryRepository, PaginatedResult, Pagination, RepositoryError,
    SessionRepository, TaskRepository, UserRepository,
};

// =============================================================================
// Error Mapping
// =============================================================================

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a `sqlx` error to a `RepositoryError`.
///
/// Constraint violations become `NotFound` (dangling reference) or
/// `Conflict` (duplicate key); everything else is a `DatabaseError`.
fn map_database_error(error: sqlx::Error) -> RepositoryError {
    let code = error
        .as_database_error()
        .and_then(|database_error| database_error.code().map(|code| code.into_owned()));

    match code.as_deref() {
        Some(FOREIGN_KEY_VIOLATION) => RepositoryError::NotFound(error.to_string()),
        Some(UNIQUE_VIOLATION) => RepositoryError::Conflict(error.to_string()),
        _ => RepositoryError::DatabaseError(error.to_string()),
    }
}

#[allow(clippy::cast_sign_loss)]
const fn count_to_u64(count: i64) -> u64 {
    if count < 0 { 0 } else { count as u64 }
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    uuid: Uuid,
    title: String,
    description: Option<String>,
    complete: bool,
    due: Option<DateTime<Utc>>,
    priority: String,
    category_uuid: Option<Uuid>,
    owner_uuid: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let priority = row
            .priority
            .parse()
            .map_err(|error: crate::domain::ParsePriorityError| {
                RepositoryError::DatabaseError(error.to_string())
            })?;

        Ok(Self {
            task_id: TaskId::from_uuid(row.uuid),
            title: row.title,
            description: row.description,
            complete: row.complete,
            due: row.due.map(Timestamp::from_datetime),
            priority,
            category_id: row.category_uuid.map(CategoryId::from_uuid),
            owner_id: row.owner_uuid.map(UserId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    uuid: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            category_id: CategoryId::from_uuid(row.uuid),
            name: row.name,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    uuid: Uuid,
    username: String,
    email: Option<String>,
    password_hash: String,
    date_joined: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self::new(
            UserId::from_uuid(row.uuid),
            row.username,
            row.email,
            row.password_hash,
            Timestamp::from_datetime(row.date_joined),
        )
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    token: String,
    user_uuid: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            token: SessionToken::new(row.token),
            user_id: UserId::from_uuid(row.user_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
        }
    }
}

const TASK_COLUMNS: &str = "uuid, title, description, complete, due, priority, \
                            category_uuid, owner_uuid, created_at, updated_at";

// =============================================================================
// PostgreSQL Task Repository
// =============================================================================

/// `PostgreSQL` implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/todo").await?;
/// let repository = PostgresTaskRepository::new(pool);
///
/// repository.insert(&task).await?;
/// let found = repository.find_by_id(&task.task_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new `PostgreSQL` task repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM task WHERE uuid = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_database_error)?;

        row.map(Task::try_from).transpose()
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Task>, RepositoryError> {
        let count_row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task WHERE owner_uuid = $1")
            .bind(owner.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(map_database_error)?;

        let total = count_to_u64(count_row.0);
        if total == 0 {
            return Ok(PaginatedResult::empty(pagination));
        }

        #[allow(clippy::cast_possible_wrap)]
        let offset = pagination.offset() as i64;
        let limit = i64::from(pagination.limit());

        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM task WHERE owner_uuid = $1 \
             ORDER BY due DESC NULLS LAST, created_at DESC, uuid ASC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(owner.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_database_error)?;

        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedResult::new(
            tasks,
            total,
            pagination.page,
            pagination.page_size,
        ))
    }

    async fn insert(&self, task: &Task) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO task (uuid, title, description, complete, due, priority, \
                               category_uuid, owner_uuid, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(task.task_id.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.complete)
        .bind(task.due.as_ref().map(Timestamp::as_datetime))
        .bind(task.priority.as_str())
        .bind(task.category_id.as_ref().map(CategoryId::as_uuid))
        .bind(task.owner_id.as_ref().map(UserId::as_uuid))
        .bind(task.created_at.as_datetime())
        .bind(task.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE task SET title = $2, description = $3, complete = $4, due = $5, \
                             priority = $6, category_uuid = $7, owner_uuid = $8, \
                             updated_at = $9 \
             WHERE uuid = $1",
        )
        .bind(task.task_id.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.complete)
        .bind(task.due.as_ref().map(Timestamp::as_datetime))
        .bind(task.priority.as_str())
        .bind(task.category_id.as_ref().map(CategoryId::as_uuid))
        .bind(task.owner_id.as_ref().map(UserId::as_uuid))
        .bind(task.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_database_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("task {}", task.task_id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM task WHERE uuid = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_database_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task")
            .fetch_one(&self.pool)
            .await
            .map_err(map_database_error)?;

        Ok(count_to_u64(row.0))
    }
}

// =============================================================================
// PostgreSQL Category Repository
// =============================================================================

/// `PostgreSQL` implementation of `CategoryRepository`.
///
/// Task cleanup on delete is left to the `ON DELETE CASCADE` foreign key.
/// The delete locks the category row first; inserting a task that
/// references it takes a key-share lock on the same row, so no task can be
/// filed between the ownership check and the cascade.
#[derive(Debug, Clone)]
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    /// Creates a new `PostgreSQL` category repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT uuid, name, created_at, updated_at FROM category WHERE uuid = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(row.map(Category::from))
    }

    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT uuid, name, created_at, updated_at FROM category ORDER BY name, uuid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn save(&self, category: &Category) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO category (uuid, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (uuid) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(category.category_id.as_uuid())
        .bind(&category.name)
        .bind(category.created_at.as_datetime())
        .bind(category.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(())
    }

    async fn delete(
        &self,
        id: &CategoryId,
        requested_by: &UserId,
    ) -> Result<CategoryDeletion, RepositoryError> {
        let mut transaction = self.pool.begin().await.map_err(map_database_error)?;

        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM category WHERE uuid = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *transaction)
                .await
                .map_err(map_database_error)?;
        if locked.is_none() {
            return Ok(CategoryDeletion::Missing);
        }

        let (held_by_others,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM task \
                            WHERE category_uuid = $1 AND owner_uuid IS DISTINCT FROM $2)",
        )
        .bind(id.as_uuid())
        .bind(requested_by.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(map_database_error)?;
        if held_by_others {
            return Ok(CategoryDeletion::InUse);
        }

        sqlx::query("DELETE FROM category WHERE uuid = $1")
            .bind(id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(map_database_error)?;
        transaction.commit().await.map_err(map_database_error)?;

        Ok(CategoryDeletion::Deleted)
    }
}

// =============================================================================
// PostgreSQL User Repository
// =============================================================================

/// `PostgreSQL` implementation of `UserRepository`.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new `PostgreSQL` user repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT uuid, username, email, password_hash, date_joined FROM users WHERE uuid = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT uuid, username, email, password_hash, date_joined \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(row.map(User::from))
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (uuid, username, email, password_hash, date_joined) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.username)
        .bind(user.email.as_deref())
        .bind(&user.password_hash)
        .bind(user.date_joined.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(())
    }
}

// =============================================================================
// PostgreSQL Session Repository
// =============================================================================

/// `PostgreSQL` implementation of `SessionRepository`.
#[derive(Debug, Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    /// Creates a new `PostgreSQL` session repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_uuid, created_at, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(session.token.as_str())
        .bind(session.user_id.as_uuid())
        .bind(session.created_at.as_datetime())
        .bind(session.expires_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(())
    }

    async fn find_active(
        &self,
        token: &SessionToken,
        now: &Timestamp,
    ) -> Result<Option<Session>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT token, user_uuid, created_at, expires_at FROM sessions \
             WHERE token = $1 AND expires_at > $2",
        )
        .bind(token.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_database_error)?;

        Ok(row.map(Session::from))
    }

    async fn delete(&self, token: &SessionToken) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_database_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: &Timestamp) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(map_database_error)?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Tests
// =============================================================================
