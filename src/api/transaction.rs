//! Task mutation handlers: create, update, delete and the completion toggle.
//!
//! Every handler requires a logged-in user. Update, delete and the toggle
//! additionally require that user to own the task; anything else is a 404.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::access::{load_owned_task, store_owned_task};
use super::dto::{
    CompleteQuery, TaskData, TaskForm, TaskFormData, TaskResponse, category_index,
};
use super::error::ApiErrorResponse;
use super::handlers::AppState;
use super::routes::{TASK_LIST_PATH, task_detail_path};
use super::session::{CurrentUser, FlashMessage, push_flash, redirect, render};
use crate::domain::{TaskId, Timestamp};

// =============================================================================
// /tasks/create/ Handlers
// =============================================================================

/// Shows the empty task form.
pub async fn create_task_form(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let categories = state.category_repository.list().await?;
    let data = TaskFormData::new(None, TaskForm::default(), Vec::new(), &categories);
    Ok(render(jar, StatusCode::OK, "task_form", data))
}

/// Creates a task owned by the caller.
///
/// # Response
///
/// - **303 See Other**: created; redirects to the new task's detail page
/// - **400 Bad Request**: `task_form` view with field errors and the
///   submitted values
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<TaskForm>,
) -> Result<Response, ApiErrorResponse> {
    let categories = state.category_repository.list().await?;

    let input = match form.validate(&categories) {
        Ok(input) => input,
        Err(error) => {
            let data = TaskFormData::new(None, form, error.errors, &categories);
            return Ok(render(jar, StatusCode::BAD_REQUEST, "task_form", data));
        }
    };

    let task = input.into_task(TaskId::generate(), user.user_id.clone(), Timestamp::now());
    state.task_repository.insert(&task).await?;

    tracing::info!(task_id = %task.task_id, user_id = %user.user_id, "Task created");

    let jar = push_flash(jar, FlashMessage::TaskCreated, state.config.secure_cookies);
    Ok(redirect(jar, &task_detail_path(&task.task_id)))
}

// =============================================================================
// /task/{id}/update/ Handlers
// =============================================================================

/// Shows the task form pre-filled from the task.
pub async fn update_task_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let task = load_owned_task(state.task_repository.as_ref(), &user, &task_id).await?;
    let categories = state.category_repository.list().await?;

    let data = TaskFormData::new(
        Some(task.task_id.clone()),
        TaskForm::from_task(&task),
        Vec::new(),
        &categories,
    );
    Ok(render(jar, StatusCode::OK, "task_form", data))
}

/// Overwrites the editable fields of a task.
///
/// # Response
///
/// - **303 See Other**: saved; redirects to the detail page
/// - **400 Bad Request**: `task_form` view with field errors
/// - **404 Not Found**: unknown task or not the owner
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    jar: CookieJar,
    Form(form): Form<TaskForm>,
) -> Result<Response, ApiErrorResponse> {
    let task = load_owned_task(state.task_repository.as_ref(), &user, &task_id).await?;
    let categories = state.category_repository.list().await?;

    let input = match form.validate(&categories) {
        Ok(input) => input,
        Err(error) => {
            let data = TaskFormData::new(Some(task.task_id), form, error.errors, &categories);
            return Ok(render(jar, StatusCode::BAD_REQUEST, "task_form", data));
        }
    };

    let task = input.apply(task, Timestamp::now());
    store_owned_task(state.task_repository.as_ref(), &task).await?;

    tracing::info!(task_id = %task.task_id, user_id = %user.user_id, "Task updated");

    Ok(redirect(jar, &task_detail_path(&task.task_id)))
}

// =============================================================================
// /task/{id}/delete/ Handlers
// =============================================================================

/// Shows the delete confirmation page.
pub async fn delete_task_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let task = load_owned_task(state.task_repository.as_ref(), &user, &task_id).await?;
    let categories = category_index(&state.category_repository.list().await?);

    let data = TaskData {
        task: TaskResponse::new(&task, &categories),
    };
    Ok(render(jar, StatusCode::OK, "task_confirm_delete", data))
}

/// Deletes a task and redirects to the list.
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let task = load_owned_task(state.task_repository.as_ref(), &user, &task_id).await?;
    state.task_repository.delete(&task.task_id).await?;

    tracing::info!(task_id = %task.task_id, user_id = %user.user_id, "Task deleted");

    Ok(redirect(jar, TASK_LIST_PATH))
}

// =============================================================================
// GET /task/{id}/complete/ Handler
// =============================================================================

/// Sets the completion flag from `?complete=` and redirects to the list.
///
/// `True` marks the task complete; any other value, or none, marks it
/// incomplete.
pub async fn complete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    Query(query): Query<CompleteQuery>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let task = load_owned_task(state.task_repository.as_ref(), &user, &task_id).await?;
    let complete = query.requested_state();

    let task = task.with_complete(complete).with_updated_at(Timestamp::now());
    store_owned_task(state.task_repository.as_ref(), &task).await?;

    tracing::info!(task_id = %task.task_id, complete, "Task completion toggled");

    Ok(redirect(jar, TASK_LIST_PATH))
}
