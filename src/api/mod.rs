//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.
//! Pages are returned as JSON view descriptors; form submissions answer with
//! `303 See Other` redirects.

pub mod access;
pub mod auth;
pub mod category;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod query;
pub mod routes;
pub mod session;
pub mod transaction;

pub use access::{authorize_mutation, authorize_view, list_visible};
pub use auth::{login, login_form, logout, register, register_form, safe_next};
pub use category::{create_category, delete_category, list_categories};
pub use dto::{TaskForm, TaskResponse, View};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use handlers::{AppConfig, AppConfigError, AppState, HealthResponse, health_check};
pub use query::{get_task, list_tasks};
pub use routes::{CATEGORY_LIST_PATH, TASK_LIST_PATH, create_router, task_detail_path};
pub use session::{CurrentUser, FlashMessage};
pub use transaction::{
    complete_task, create_task, create_task_form, delete_task, delete_task_form, update_task,
    update_task_form,
};
