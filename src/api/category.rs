//! Category handlers.
//!
//! Categories are shared by all users. Deleting one also deletes every task
//! filed under it, so a user may only delete a category that holds nothing
//! but their own tasks.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::dto::{CategoryForm, CategoryListData, CategoryResponse};
use super::error::{ApiErrorResponse, FieldError};
use super::handlers::AppState;
use super::routes::CATEGORY_LIST_PATH;
use super::session::{CurrentUser, redirect, render};
use crate::domain::{Category, CategoryId, Timestamp};
use crate::infrastructure::CategoryDeletion;

const CATEGORY_NOT_FOUND: &str = "No category found matching the query";
const CATEGORY_IN_USE: &str = "This category still holds tasks belonging to other users";

async fn render_list(
    state: &AppState,
    jar: CookieJar,
    status: StatusCode,
    form: CategoryForm,
    errors: Vec<FieldError>,
) -> Result<Response, ApiErrorResponse> {
    let categories = state.category_repository.list().await?;
    let data = CategoryListData {
        categories: categories.iter().map(CategoryResponse::from).collect(),
        form,
        errors,
    };
    Ok(render(jar, status, "category_list", data))
}

/// Lists all categories together with an empty create form.
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    render_list(&state, jar, StatusCode::OK, CategoryForm::default(), Vec::new()).await
}

/// Creates a category.
///
/// # Response
///
/// - **303 See Other**: created; redirects to the category list
/// - **400 Bad Request**: `category_list` view with field errors
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<CategoryForm>,
) -> Result<Response, ApiErrorResponse> {
    let name = match form.validate() {
        Ok(name) => name,
        Err(error) => {
            return render_list(&state, jar, StatusCode::BAD_REQUEST, form, error.errors).await;
        }
    };

    let category = Category::new(CategoryId::generate(), name, Timestamp::now());
    state.category_repository.save(&category).await?;

    tracing::info!(
        category_id = %category.category_id,
        user_id = %user.user_id,
        "Category created"
    );

    Ok(redirect(jar, CATEGORY_LIST_PATH))
}

/// Deletes a category and all of its tasks.
///
/// # Response
///
/// - **303 See Other**: deleted; redirects to the category list
/// - **404 Not Found**: unknown or malformed id
/// - **409 Conflict**: another user's task, or an ownerless one, is filed
///   under the category; nothing is deleted
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    let category_id = category_id
        .parse::<CategoryId>()
        .map_err(|_| ApiErrorResponse::not_found(CATEGORY_NOT_FOUND))?;

    match state
        .category_repository
        .delete(&category_id, &user.user_id)
        .await?
    {
        CategoryDeletion::Deleted => {
            tracing::info!(%category_id, user_id = %user.user_id, "Category deleted");
            Ok(redirect(jar, CATEGORY_LIST_PATH))
        }
        CategoryDeletion::Missing => Err(ApiErrorResponse::not_found(CATEGORY_NOT_FOUND)),
        CategoryDeletion::InUse => {
            tracing::warn!(
                %category_id,
                user_id = %user.user_id,
                "Category delete refused: holds other users' tasks"
            );
            Err(ApiErrorResponse::conflict(CATEGORY_IN_USE))
        }
    }
}
