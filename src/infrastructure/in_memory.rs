//! In-memory repository implementations.
//!
//! All repositories created from one [`InMemoryDatabase`] share a single set
//! of tables behind one `tokio::sync::RwLock`, so they observe each other's
//! writes and enforce the same referential rules as the `PostgreSQL` schema:
//!
//! - a task may only reference an existing category and owner
//! - deleting a category deletes its tasks
//! - usernames are unique
//!
//! These implementations are suitable for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    Category, CategoryId, Session, SessionToken, Task, TaskId, Timestamp, User, UserId,
};
use crate::infrastructure::{
    CategoryDeletion, CategoryRepository, PaginatedResult, Pagination, RepositoryError,
    SessionRepository, TaskRepository, UserRepository,
};

// =============================================================================
// Shared Tables
// =============================================================================

#[derive(Debug, Default)]
struct Tables {
    tasks: HashMap<TaskId, Task>,
    categories: HashMap<CategoryId, Category>,
    users: HashMap<UserId, User>,
    sessions: HashMap<SessionToken, Session>,
}

impl Tables {
    /// Foreign keys of `task` must point at stored rows.
    fn check_references(&self, task: &Task) -> Result<(), RepositoryError> {
        if let Some(category_id) = &task.category_id
            && !self.categories.contains_key(category_id)
        {
            return Err(RepositoryError::NotFound(format!("category {category_id}")));
        }
        if let Some(owner_id) = &task.owner_id
            && !self.users.contains_key(owner_id)
        {
            return Err(RepositoryError::NotFound(format!("user {owner_id}")));
        }
        Ok(())
    }
}

type SharedTables = Arc<RwLock<Tables>>;

/// Handle to a set of in-memory tables.
///
/// Cloning the handle shares the tables.
///
/// # Example
///
/// ```ignore
/// let database = InMemoryDatabase::new();
/// let tasks = database.task_repository();
/// let categories = database.category_repository();
///
/// categories.save(&category).await?;
/// tasks.insert(&task.with_category(Some(category.category_id.clone()))).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: SharedTables,
}

impl InMemoryDatabase {
    /// Creates a new empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a task repository over these tables.
    #[must_use]
    pub fn task_repository(&self) -> InMemoryTaskRepository {
        InMemoryTaskRepository {
            tables: Arc::clone(&self.tables),
        }
    }

    /// Returns a category repository over these tables.
    #[must_use]
    pub fn category_repository(&self) -> InMemoryCategoryRepository {
        InMemoryCategoryRepository {
            tables: Arc::clone(&self.tables),
        }
    }

    /// Returns a user repository over these tables.
    #[must_use]
    pub fn user_repository(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            tables: Arc::clone(&self.tables),
        }
    }

    /// Returns a session repository over these tables.
    #[must_use]
    pub fn session_repository(&self) -> InMemorySessionRepository {
        InMemorySessionRepository {
            tables: Arc::clone(&self.tables),
        }
    }
}

// =============================================================================
// In-Memory Task Repository
// =============================================================================

/// In-memory implementation of `TaskRepository`.
#[derive(Debug, Clone)]
pub struct InMemoryTaskRepository {
    tables: SharedTables,
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        let guard = self.tables.read().await;
        Ok(guard.tasks.get(id).cloned())
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Task>, RepositoryError> {
        let guard = self.tables.read().await;
        let mut owned: Vec<Task> = guard
            .tasks
            .values()
            .filter(|task| task.is_owned_by(owner))
            .cloned()
            .collect();
        drop(guard);

        owned.sort_by(Task::listing_order);

        let total = owned.len() as u64;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let limit = pagination.limit() as usize;
        let items: Vec<Task> = owned.into_iter().skip(offset).take(limit).collect();

        Ok(PaginatedResult::new(
            items,
            total,
            pagination.page,
            pagination.page_size,
        ))
    }

    async fn insert(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut guard = self.tables.write().await;
        if guard.tasks.contains_key(&task.task_id) {
            return Err(RepositoryError::Conflict(format!("task {}", task.task_id)));
        }
        guard.check_references(task)?;

        guard.tasks.insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut guard = self.tables.write().await;
        guard.check_references(task)?;

        let Some(stored) = guard.tasks.get_mut(&task.task_id) else {
            return Err(RepositoryError::NotFound(format!("task {}", task.task_id)));
        };
        stored.clone_from(task);
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, RepositoryError> {
        let mut guard = self.tables.write().await;
        Ok(guard.tasks.remove(id).is_some())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let guard = self.tables.read().await;
        Ok(guard.tasks.len() as u64)
    }
}

// =============================================================================
// In-Memory Category Repository
// =============================================================================

/// In-memory implementation of `CategoryRepository`.
#[derive(Debug, Clone)]
pub struct InMemoryCategoryRepository {
    tables: SharedTables,
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let guard = self.tables.read().await;
        Ok(guard.categories.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let guard = self.tables.read().await;
        let mut categories: Vec<Category> = guard.categories.values().cloned().collect();
        drop(guard);

        categories.sort_by(|left, right| {
            left.name
                .cmp(&right.name)
                .then_with(|| left.category_id.cmp(&right.category_id))
        });
        Ok(categories)
    }

    async fn save(&self, category: &Category) -> Result<(), RepositoryError> {
        let mut guard = self.tables.write().await;
        guard
            .categories
            .insert(category.category_id.clone(), category.clone());
        Ok(())
    }

    async fn delete(
        &self,
        id: &CategoryId,
        requested_by: &UserId,
    ) -> Result<CategoryDeletion, RepositoryError> {
        let mut guard = self.tables.write().await;
        if !guard.categories.contains_key(id) {
            return Ok(CategoryDeletion::Missing);
        }
        let held_by_others = guard
            .tasks
            .values()
            .any(|task| task.is_in_category(id) && !task.is_owned_by(requested_by));
        if held_by_others {
            return Ok(CategoryDeletion::InUse);
        }

        guard.categories.remove(id);
        // ON DELETE CASCADE
        guard.tasks.retain(|_, task| !task.is_in_category(id));
        Ok(CategoryDeletion::Deleted)
    }
}

// =============================================================================
// In-Memory User Repository
// =============================================================================

/// In-memory implementation of `UserRepository`.
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    tables: SharedTables,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.tables.read().await;
        Ok(guard.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let guard = self.tables.read().await;
        Ok(guard
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut guard = self.tables.write().await;

        if guard
            .users
            .values()
            .any(|existing| existing.username == user.username)
        {
            return Err(RepositoryError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        guard.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }
}

// =============================================================================
// In-Memory Session Repository
// =============================================================================

/// In-memory implementation of `SessionRepository`.
#[derive(Debug, Clone)]
pub struct InMemorySessionRepository {
    tables: SharedTables,
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut guard = self.tables.write().await;
        if !guard.users.contains_key(&session.user_id) {
            return Err(RepositoryError::NotFound(format!("user {}", session.user_id)));
        }
        guard.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_active(
        &self,
        token: &SessionToken,
        now: &Timestamp,
    ) -> Result<Option<Session>, RepositoryError> {
        let guard = self.tables.read().await;
        Ok(guard
            .sessions
            .get(token)
            .filter(|session| session.is_active(now))
            .cloned())
    }

    async fn delete(&self, token: &SessionToken) -> Result<bool, RepositoryError> {
        let mut guard = self.tables.write().await;
        Ok(guard.sessions.remove(token).is_some())
    }

    async fn delete_expired(&self, now: &Timestamp) -> Result<u64, RepositoryError> {
        let mut guard = self.tables.write().await;
        let before = guard.sessions.len();
        guard.sessions.retain(|_, session| session.is_active(now));
        Ok((before - guard.sessions.len()) as u64)
    }
}

// =============================================================================
// Tests
// =============================================================================
