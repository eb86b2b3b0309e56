//! Storage contracts used by the request handlers.
//!
//! Every entity has a small trait listing exactly the queries the pages
//! issue. `in_memory` and `postgres` provide the two implementations.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Category, CategoryId, Session, SessionToken, Task, TaskId, Timestamp, User, UserId,
};

/// Failure reported by a repository.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique key is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend failed.
    #[error("storage failure: {0}")]
    DatabaseError(String),
}

// =============================================================================
// Paging
// =============================================================================

/// Which slice of a listing to fetch. `page` counts from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// # Panics
    ///
    /// When `page_size` is zero.
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Self {
        assert!(page_size != 0, "a page holds at least one row");
        Self { page, page_size }
    }

    /// Rows to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page as u64 * self.page_size as u64
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, 10)
    }
}

/// One page of rows plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    /// Rows across every page.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PaginatedResult<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total,
            page,
            page_size,
        }
    }

    /// A listing with no rows at the requested position.
    #[must_use]
    pub const fn empty(pagination: Pagination) -> Self {
        Self::new(Vec::new(), 0, pagination.page, pagination.page_size)
    }

    /// Pages needed to show every row; zero for an empty listing.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        match self.page_size {
            0 => 0,
            size => self.total.div_ceil(size as u64),
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page as u64 + 1 < self.total_pages()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page != 0
    }
}

// =============================================================================
// Task Repository
// =============================================================================

/// Task storage.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError>;

    /// Lists the tasks owned by `owner`, latest due date first.
    async fn list_by_owner(
        &self,
        owner: &UserId,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Task>, RepositoryError>;

    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// `Conflict` if the id is taken, `NotFound` if the category or owner
    /// does not exist.
    async fn insert(&self, task: &Task) -> Result<(), RepositoryError>;

    /// Overwrites every column of an existing task. Concurrent updates race
    /// and the last write wins.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task is gone (so a racing delete is never undone),
    /// or if the category or owner does not exist.
    async fn update(&self, task: &Task) -> Result<(), RepositoryError>;

    /// Removes a task, reporting whether it existed.
    async fn delete(&self, id: &TaskId) -> Result<bool, RepositoryError>;

    /// Tasks of every owner. No page needs this; tests use it to observe
    /// cascades.
    async fn count(&self) -> Result<u64, RepositoryError>;
}

// =============================================================================
// Category Repository
// =============================================================================

/// Category storage. Categories are shared by every user.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Lists all categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Saves a category (insert or update).
    async fn save(&self, category: &Category) -> Result<(), RepositoryError>;

    /// Removes a category on behalf of `requested_by`, cascading to the
    /// tasks filed under it.
    ///
    /// Refused with [`CategoryDeletion::InUse`] while any of those tasks has
    /// another owner or no owner, so one user can never cascade away
    /// someone else's tasks. Check and delete happen atomically.
    async fn delete(
        &self,
        id: &CategoryId,
        requested_by: &UserId,
    ) -> Result<CategoryDeletion, RepositoryError>;
}

/// Outcome of [`CategoryRepository::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryDeletion {
    /// The category and the requester's tasks in it are gone.
    Deleted,
    Missing,
    /// Tasks not owned by the requester are filed under it; nothing changed.
    InUse,
}

// =============================================================================
// User Repository
// =============================================================================

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Finds a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is already taken.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;
}

// =============================================================================
// Session Repository
// =============================================================================

/// Login session storage, keyed by cookie token.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a new session.
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError>;

    /// Finds the session for `token` if it is still active at `now`.
    async fn find_active(
        &self,
        token: &SessionToken,
        now: &Timestamp,
    ) -> Result<Option<Session>, RepositoryError>;

    /// Deletes the session for `token`.
    ///
    /// Returns `Ok(true)` if a session was removed.
    async fn delete(&self, token: &SessionToken) -> Result<bool, RepositoryError>;

    /// Deletes every session that expired before `now`, returning how many
    /// were removed.
    async fn delete_expired(&self, now: &Timestamp) -> Result<u64, RepositoryError>;
}
