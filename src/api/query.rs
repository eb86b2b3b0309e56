//! Read-only task handlers: the paginated list and the detail page.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::access::{list_visible, load_viewable_task};
use super::dto::{ListQuery, PageInfo, TaskData, TaskListData, TaskResponse, category_index};
use super::error::ApiErrorResponse;
use super::handlers::AppState;
use super::session::{CurrentUser, render};
use crate::domain::Identity;
use crate::infrastructure::Pagination;

// =============================================================================
// Page Parameter
// =============================================================================

/// A requested list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// 1-based page number.
    Number(u32),
    /// The last page.
    Last,
}

/// Parses the `page` query parameter. Absent means the first page.
///
/// Returns `None` for anything that is not a positive number or `last`.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> Option<PageRequest> {
    match raw.map(str::trim) {
        None | Some("") => Some(PageRequest::Number(1)),
        Some("last") => Some(PageRequest::Last),
        Some(value) => value
            .parse::<u32>()
            .ok()
            .filter(|number| *number > 0)
            .map(PageRequest::Number),
    }
}

const INVALID_PAGE: &str = "Invalid page.";

// =============================================================================
// GET / and GET /tasks/ Handler
// =============================================================================

/// Lists the caller's tasks, latest due date first.
///
/// # Query Parameters
///
/// - `page`: 1-based page number or `last` (default 1)
///
/// # Response
///
/// - **200 OK**: `task_list` view
/// - **303 See Other**: not logged in
/// - **404 Not Found**: invalid or out-of-range page
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let identity = Identity::Authenticated(user);
    let page_size = state.config.page_size;
    let tasks = state.task_repository.as_ref();

    let request =
        parse_page(query.page.as_deref()).ok_or_else(|| ApiErrorResponse::not_found(INVALID_PAGE))?;

    let page_index = match request {
        PageRequest::Number(number) => number - 1,
        PageRequest::Last => {
            let first = list_visible(&identity, tasks, Pagination::new(0, page_size)).await?;
            let last = first.total_pages().max(1) - 1;
            u32::try_from(last).unwrap_or(u32::MAX)
        }
    };

    let result = list_visible(&identity, tasks, Pagination::new(page_index, page_size)).await?;
    if page_index > 0 && result.items.is_empty() {
        return Err(ApiErrorResponse::not_found(INVALID_PAGE));
    }

    let categories = category_index(&state.category_repository.list().await?);
    let data = TaskListData {
        page: PageInfo::from(&result),
        tasks: result
            .items
            .iter()
            .map(|task| TaskResponse::new(task, &categories))
            .collect(),
    };

    Ok(render(jar, StatusCode::OK, "task_list", data))
}

// =============================================================================
// GET /task/{id} Handler
// =============================================================================

/// Shows a single task.
///
/// # Response
///
/// - **200 OK**: `task_detail` view
/// - **404 Not Found**: unknown or malformed id, or a task owned by someone else
pub async fn get_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(task_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let task = load_viewable_task(state.task_repository.as_ref(), &identity, &task_id).await?;

    let categories = match &task.category_id {
        Some(category_id) => state
            .category_repository
            .find_by_id(category_id)
            .await?
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let data = TaskData {
        task: TaskResponse::new(&task, &category_index(&categories)),
    };
    Ok(render(jar, StatusCode::OK, "task_detail", data))
}
