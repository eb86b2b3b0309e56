//! Access control policy.
//!
//! Tasks are private to their owner. Listing only ever returns the caller's
//! own tasks, and every mutation requires the caller to own the task.
//! Ownerless tasks (legacy rows) can be viewed by anyone but changed by no
//! one. A denied lookup is indistinguishable from a missing task.

use crate::domain::{Identity, Task, TaskId, User};
use crate::infrastructure::{PaginatedResult, Pagination, RepositoryError, TaskRepository};

use super::error::ApiErrorResponse;

const TASK_NOT_FOUND: &str = "No task found matching the query";

/// Lists the tasks visible to `identity`.
///
/// An authenticated identity sees its own tasks, latest due date first.
/// An anonymous identity always gets an empty page.
///
/// # Errors
///
/// Returns `RepositoryError` if the underlying query fails.
pub async fn list_visible(
    identity: &Identity,
    tasks: &dyn TaskRepository,
    pagination: Pagination,
) -> Result<PaginatedResult<Task>, RepositoryError> {
    match identity.user_id() {
        Some(user_id) => tasks.list_by_owner(user_id, pagination).await,
        None => Ok(PaginatedResult::empty(pagination)),
    }
}

/// Returns `true` if `identity` may update, complete or delete `task`.
#[must_use]
pub fn authorize_mutation(identity: &Identity, task: &Task) -> bool {
    identity
        .user_id()
        .is_some_and(|user_id| task.is_owned_by(user_id))
}

/// Returns `true` if `identity` may view `task`.
#[must_use]
pub fn authorize_view(identity: &Identity, task: &Task) -> bool {
    task.owner_id.is_none() || authorize_mutation(identity, task)
}

async fn find_task(tasks: &dyn TaskRepository, raw_id: &str) -> Result<Task, ApiErrorResponse> {
    let Ok(task_id) = raw_id.parse::<TaskId>() else {
        return Err(ApiErrorResponse::not_found(TASK_NOT_FOUND));
    };

    tasks
        .find_by_id(&task_id)
        .await?
        .ok_or_else(|| ApiErrorResponse::not_found(TASK_NOT_FOUND))
}

/// Loads the task addressed by `raw_id` for viewing.
///
/// # Errors
///
/// Returns 404 if the id is malformed, unknown, or not viewable by
/// `identity`, and 500 if the lookup fails.
pub async fn load_viewable_task(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    raw_id: &str,
) -> Result<Task, ApiErrorResponse> {
    let task = find_task(tasks, raw_id).await?;
    if authorize_view(identity, &task) {
        Ok(task)
    } else {
        tracing::debug!(task_id = %task.task_id, "View denied");
        Err(ApiErrorResponse::not_found(TASK_NOT_FOUND))
    }
}

/// Loads the task addressed by `raw_id` for a mutation by `user`.
///
/// # Errors
///
/// Returns 404 if the id is malformed, unknown, or not owned by `user`, and
/// 500 if the lookup fails.
pub async fn load_owned_task(
    tasks: &dyn TaskRepository,
    user: &User,
    raw_id: &str,
) -> Result<Task, ApiErrorResponse> {
    let task = find_task(tasks, raw_id).await?;
    if task.is_owned_by(&user.user_id) {
        Ok(task)
    } else {
        tracing::warn!(
            task_id = %task.task_id,
            user_id = %user.user_id,
            "Mutation denied for non-owner"
        );
        Err(ApiErrorResponse::not_found(TASK_NOT_FOUND))
    }
}

/// Writes back a task obtained from [`load_owned_task`].
///
/// # Errors
///
/// Returns 404 when the task was deleted after it was loaded; the write
/// never recreates it. Other storage failures become 500.
pub async fn store_owned_task(
    tasks: &dyn TaskRepository,
    task: &Task,
) -> Result<(), ApiErrorResponse> {
    tasks.update(task).await.map_err(|error| match error {
        RepositoryError::NotFound(detail) => {
            tracing::debug!(task_id = %task.task_id, %detail, "Task gone before write");
            ApiErrorResponse::not_found(TASK_NOT_FOUND)
        }
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timestamp, UserId};
    use crate::infrastructure::{InMemoryDatabase, UserRepository};
    use axum::http::StatusCode;
    use proptest::prelude::*;
    use rstest::rstest;

    fn user(username: &str) -> User {
        User::new(UserId::generate(), username, None, "hash", Timestamp::now())
    }

    fn task_owned_by(owner: Option<&User>) -> Task {
        let task = Task::new(TaskId::generate(), "Task", Timestamp::now());
        match owner {
            Some(owner) => task.with_owner(owner.user_id.clone()),
            None => task,
        }
    }

    // -------------------------------------------------------------------------
    // Policy Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_authorize_mutation_requires_owner() {
        let alice = user("alice");
        let bob = user("bob");
        let task = task_owned_by(Some(&alice));

        assert!(authorize_mutation(&Identity::Authenticated(alice), &task));
        assert!(!authorize_mutation(&Identity::Authenticated(bob), &task));
        assert!(!authorize_mutation(&Identity::Anonymous, &task));
    }

    #[rstest]
    fn test_ownerless_task_is_viewable_but_not_mutable() {
        let alice = Identity::Authenticated(user("alice"));
        let legacy = task_owned_by(None);

        assert!(authorize_view(&alice, &legacy));
        assert!(authorize_view(&Identity::Anonymous, &legacy));
        assert!(!authorize_mutation(&alice, &legacy));
    }

    #[rstest]
    fn test_owned_task_is_hidden_from_others() {
        let alice = user("alice");
        let task = task_owned_by(Some(&alice));

        assert!(!authorize_view(&Identity::Anonymous, &task));
        assert!(!authorize_view(&Identity::Authenticated(user("bob")), &task));
    }

    // -------------------------------------------------------------------------
    // Loader Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_load_owned_task_hides_foreign_and_malformed_ids() {
        let database = InMemoryDatabase::new();
        let alice = user("alice");
        let bob = user("bob");
        database.user_repository().insert(&alice).await.unwrap();
        let tasks = database.task_repository();
        let task = task_owned_by(Some(&alice));
        tasks.insert(&task).await.unwrap();

        let raw_id = task.task_id.to_string();
        assert!(load_owned_task(&tasks, &alice, &raw_id).await.is_ok());

        for (requester, raw_id) in [(&bob, raw_id.as_str()), (&alice, "1"), (&alice, "")] {
            let error = load_owned_task(&tasks, requester, raw_id).await.unwrap_err();
            assert_eq!(error.status, StatusCode::NOT_FOUND);
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_store_owned_task_after_concurrent_delete_is_not_found() {
        let database = InMemoryDatabase::new();
        let alice = user("alice");
        database.user_repository().insert(&alice).await.unwrap();
        let tasks = database.task_repository();
        let task = task_owned_by(Some(&alice));
        tasks.insert(&task).await.unwrap();

        let loaded = load_owned_task(&tasks, &alice, &task.task_id.to_string())
            .await
            .unwrap();
        assert!(tasks.delete(&task.task_id).await.unwrap());

        let error = store_owned_task(&tasks, &loaded.with_complete(true))
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.error.message, TASK_NOT_FOUND);
        assert!(tasks.find_by_id(&task.task_id).await.unwrap().is_none());
    }

    // -------------------------------------------------------------------------
    // Property Tests
    // -------------------------------------------------------------------------

    proptest! {
        #[test]
        fn anonymous_listing_is_always_empty(owned_counts in prop::collection::vec(0usize..6, 0..4)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            let page = runtime.block_on(async {
                let database = InMemoryDatabase::new();
                let tasks = database.task_repository();
                for (index, count) in owned_counts.iter().enumerate() {
                    let owner = user(&format!("user{index}"));
                    database.user_repository().insert(&owner).await.unwrap();
                    for _ in 0..*count {
                        tasks.insert(&task_owned_by(Some(&owner))).await.unwrap();
                    }
                }
                tasks.insert(&task_owned_by(None)).await.unwrap();

                list_visible(&Identity::Anonymous, &tasks, Pagination::default())
                    .await
                    .unwrap()
            });

            prop_assert!(page.items.is_empty());
            prop_assert_eq!(page.total, 0);
        }
    }
}
