//! URL layout.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::auth::{login, login_form, logout, register, register_form};
use super::category::{create_category, delete_category, list_categories};
use super::handlers::{AppState, health_check};
use super::query::{get_task, list_tasks};
use super::transaction::{
    complete_task, create_task, create_task_form, delete_task, delete_task_form, update_task,
    update_task_form,
};
use crate::domain::TaskId;

/// Path of the task list.
pub const TASK_LIST_PATH: &str = "/tasks/";

/// Path of the category list.
pub const CATEGORY_LIST_PATH: &str = "/categories/";

/// Path of a task's detail page.
#[must_use]
pub fn task_detail_path(task_id: &TaskId) -> String {
    format!("/task/{task_id}")
}

/// Builds the application router with request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Tasks
        .route("/", get(list_tasks))
        .route(TASK_LIST_PATH, get(list_tasks))
        .route("/tasks/create/", get(create_task_form).post(create_task))
        .route("/task/{id}", get(get_task))
        .route("/task/{id}/update/", get(update_task_form).post(update_task))
        .route("/task/{id}/delete/", get(delete_task_form).post(delete_task))
        .route("/task/{id}/complete/", get(complete_task))
        // Categories
        .route(CATEGORY_LIST_PATH, get(list_categories).post(create_category))
        .route("/category/{id}/delete/", post(delete_category))
        // Identity
        .route("/register/", get(register_form).post(register))
        .route("/login/", get(login_form).post(login))
        .route("/logout/", get(logout).post(logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
