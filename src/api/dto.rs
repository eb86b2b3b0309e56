//! Data Transfer Objects for the API.
//!
//! Forms arrive as `application/x-www-form-urlencoded` bodies where every
//! field is an optional raw string. Each form validates into a typed input,
//! collecting one [`FieldError`] per failing field so the page can be
//! re-presented with all errors and the submitted values.
//!
//! Responses are view descriptors: a named page with its data and any
//! pending flash messages.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FieldError, ValidationError};
use crate::domain::{
    Category, CategoryId, Priority, Task, TaskId, Timestamp, User, UserId,
};
use crate::infrastructure::PaginatedResult;

// =============================================================================
// Validation Messages
// =============================================================================

const REQUIRED: &str = "This field is required.";
const INVALID_DATETIME: &str = "Enter a valid date/time.";
const INVALID_CATEGORY: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
                                numbers, and @/./+/-/_ characters.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

fn too_long(maximum: usize, actual: usize) -> String {
    format!("Ensure this value has at most {maximum} characters (it has {actual}).")
}

fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

/// Trims a raw field, treating blank as absent.
fn cleaned(raw: Option<&String>) -> Option<&str> {
    raw.map(|value| value.trim()).filter(|value| !value.is_empty())
}

/// Validates a required, length-limited text field.
fn required_text(
    errors: &mut ValidationError,
    field: &str,
    raw: Option<&String>,
    maximum: usize,
) -> Option<String> {
    let Some(value) = cleaned(raw) else {
        errors.push(field, REQUIRED);
        return None;
    };

    let length = value.chars().count();
    if length > maximum {
        errors.push(field, too_long(maximum, length));
        return None;
    }

    Some(value.to_string())
}

// =============================================================================
// Task Form
// =============================================================================

/// Accepted input formats for naive due dates, interpreted as UTC.
const DUE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a due date from an HTML `datetime-local` value or RFC 3339.
#[must_use]
pub fn parse_due(raw: &str) -> Option<Timestamp> {
    DUE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|datetime| datetime.with_timezone(&Utc))
        })
        .map(Timestamp::from_datetime)
}

/// Raw task form as submitted for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    /// Task title.
    pub title: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Due date.
    #[serde(alias = "due_date")]
    pub due: Option<String>,
    /// Priority (`low`, `medium`, `high`).
    pub priority: Option<String>,
    /// Category id.
    pub category: Option<String>,
}

/// Validated task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    /// Trimmed title.
    pub title: String,
    /// Description, absent when blank.
    pub description: Option<String>,
    /// Due date.
    pub due: Option<Timestamp>,
    /// Priority.
    pub priority: Priority,
    /// Existing category.
    pub category_id: Option<CategoryId>,
}

impl TaskForm {
    /// Builds a form pre-filled from an existing task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: task.description.clone(),
            due: task
                .due
                .as_ref()
                .map(|due| due.as_datetime().format("%Y-%m-%dT%H:%M:%S").to_string()),
            priority: Some(task.priority.as_str().to_string()),
            category: task.category_id.as_ref().map(ToString::to_string),
        }
    }

    /// Validates the form against the currently existing categories.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` holding one entry per invalid field.
    pub fn validate(&self, categories: &[Category]) -> Result<TaskInput, ValidationError> {
        let mut errors = ValidationError::default();

        let title = required_text(
            &mut errors,
            "title",
            self.title.as_ref(),
            Task::TITLE_MAX_LENGTH,
        );

        let description = cleaned(self.description.as_ref()).map(ToString::to_string);

        let due = match cleaned(self.due.as_ref()) {
            None => None,
            Some(raw) => {
                let parsed = parse_due(raw);
                if parsed.is_none() {
                    errors.push("due", INVALID_DATETIME);
                }
                parsed
            }
        };

        let priority = match cleaned(self.priority.as_ref()) {
            None => Priority::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                errors.push("priority", invalid_choice(raw));
                Priority::default()
            }),
        };

        let category_id = match cleaned(self.category.as_ref()) {
            None => None,
            Some(raw) => {
                let resolved = raw.parse::<CategoryId>().ok().filter(|category_id| {
                    categories
                        .iter()
                        .any(|category| &category.category_id == category_id)
                });
                if resolved.is_none() {
                    errors.push("category", INVALID_CATEGORY);
                }
                resolved
            }
        };

        match title {
            Some(title) => errors.into_result(TaskInput {
                title,
                description,
                due,
                priority,
                category_id,
            }),
            None => Err(errors),
        }
    }
}

impl TaskInput {
    /// Creates a new task owned by `owner`.
    #[must_use]
    pub fn into_task(self, task_id: TaskId, owner: UserId, now: Timestamp) -> Task {
        Task::new(task_id, self.title, now)
            .with_description(self.description)
            .with_due(self.due)
            .with_priority(self.priority)
            .with_category(self.category_id)
            .with_owner(owner)
    }

    /// Overwrites the editable fields of `task`, keeping its completion flag.
    #[must_use]
    pub fn apply(self, task: Task, now: Timestamp) -> Task {
        task.with_title(self.title)
            .with_description(self.description)
            .with_due(self.due)
            .with_priority(self.priority)
            .with_category(self.category_id)
            .with_updated_at(now)
    }
}

// =============================================================================
// Registration Form
// =============================================================================

/// Raw registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    /// Desired username.
    pub username: Option<String>,
    /// Optional email address.
    pub email: Option<String>,
    /// Password.
    pub password1: Option<String>,
    /// Password confirmation.
    pub password2: Option<String>,
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    /// Username.
    pub username: String,
    /// Email address, if given.
    pub email: Option<String>,
    /// Plain-text password, to be hashed before storage.
    pub password: String,
}

/// Minimum password length, in characters.
pub const PASSWORD_MIN_LENGTH: usize = 8;

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|character| character.is_alphanumeric() || "@.+-_".contains(character))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl RegisterForm {
    /// Returns a copy safe to echo back to the client.
    #[must_use]
    pub fn without_passwords(&self) -> Self {
        Self {
            username: self.username.clone(),
            email: self.email.clone(),
            password1: None,
            password2: None,
        }
    }

    /// Validates the form. Username uniqueness is checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` holding one entry per invalid field.
    pub fn validate(&self) -> Result<RegistrationInput, ValidationError> {
        let mut errors = ValidationError::default();

        let username = required_text(
            &mut errors,
            "username",
            self.username.as_ref(),
            User::USERNAME_MAX_LENGTH,
        )
        .filter(|username| {
            let valid = is_valid_username(username);
            if !valid {
                errors.push("username", INVALID_USERNAME);
            }
            valid
        });

        let email = cleaned(self.email.as_ref()).map(ToString::to_string);
        if email.as_deref().is_some_and(|email| !is_valid_email(email)) {
            errors.push("email", INVALID_EMAIL);
        }

        // Passwords are never trimmed.
        let password1 = self.password1.clone().filter(|value| !value.is_empty());
        let password2 = self.password2.clone().filter(|value| !value.is_empty());

        match &password1 {
            None => errors.push("password1", REQUIRED),
            Some(password) => {
                if password.chars().count() < PASSWORD_MIN_LENGTH {
                    errors.push("password2", PASSWORD_TOO_SHORT);
                }
                if password.chars().all(|character| character.is_ascii_digit()) {
                    errors.push("password2", PASSWORD_NUMERIC);
                }
            }
        }

        match (&password1, &password2) {
            (_, None) => errors.push("password2", REQUIRED),
            (Some(first), Some(second)) if first != second => {
                errors.push("password2", PASSWORD_MISMATCH);
            }
            _ => {}
        }

        match (username, password1) {
            (Some(username), Some(password)) => errors.into_result(RegistrationInput {
                username,
                email,
                password,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Login Form
// =============================================================================

/// Raw login form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Where to go after logging in.
    pub next: Option<String>,
}

/// Validated login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

impl LoginForm {
    /// Returns a copy safe to echo back to the client.
    #[must_use]
    pub fn without_password(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: None,
            next: self.next.clone(),
        }
    }

    /// Checks that both credentials are present.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for each missing field.
    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        let mut errors = ValidationError::default();

        let username = cleaned(self.username.as_ref()).map(ToString::to_string);
        if username.is_none() {
            errors.push("username", REQUIRED);
        }
        let password = self.password.clone().filter(|value| !value.is_empty());
        if password.is_none() {
            errors.push("password", REQUIRED);
        }

        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Category Form
// =============================================================================

/// Raw category form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    /// Category name.
    pub name: Option<String>,
}

impl CategoryForm {
    /// Validates the form into a trimmed category name.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` on `name` if it is blank or too long.
    pub fn validate(&self) -> Result<String, ValidationError> {
        let mut errors = ValidationError::default();
        let name = required_text(
            &mut errors,
            "name",
            self.name.as_ref(),
            Category::NAME_MAX_LENGTH,
        );
        name.ok_or(errors)
    }
}

// =============================================================================
// Query Parameters
// =============================================================================

/// Query parameters of the task list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// 1-based page number, or `last`.
    pub page: Option<String>,
}

/// Query parameters of the completion toggle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompleteQuery {
    /// `True` marks the task complete; anything else marks it incomplete.
    pub complete: Option<String>,
}

impl CompleteQuery {
    /// Returns the requested completion state.
    #[must_use]
    pub fn requested_state(&self) -> bool {
        self.complete.as_deref() == Some("True")
    }
}

/// Query parameters carrying a post-login destination.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    /// Destination path.
    pub next: Option<String>,
}

// =============================================================================
// View Descriptors
// =============================================================================

/// A rendered page: the view name, pending flash messages and page data.
#[derive(Debug, Clone, Serialize)]
pub struct View<T> {
    /// Name of the page template.
    pub view: &'static str,
    /// Flash messages to show once.
    pub messages: Vec<String>,
    /// Page data.
    pub data: T,
}

/// Category as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResponse {
    /// Category id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
}

impl From<&Category> for CategoryResponse {
    fn from(category: &Category) -> Self {
        Self {
            id: category.category_id.clone(),
            name: category.name.clone(),
        }
    }
}

/// Task as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Task id.
    pub id: TaskId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Completion flag.
    pub complete: bool,
    /// Due date.
    pub due: Option<Timestamp>,
    /// Priority.
    pub priority: Priority,
    /// Category, if any.
    pub category: Option<CategoryResponse>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    pub updated_at: Timestamp,
}

impl TaskResponse {
    /// Builds the response, resolving the category from `categories`.
    #[must_use]
    pub fn new(task: &Task, categories: &HashMap<CategoryId, CategoryResponse>) -> Self {
        Self {
            id: task.task_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            complete: task.complete,
            due: task.due.clone(),
            priority: task.priority,
            category: task
                .category_id
                .as_ref()
                .and_then(|category_id| categories.get(category_id).cloned()),
            created_at: task.created_at.clone(),
            updated_at: task.updated_at.clone(),
        }
    }
}

/// Indexes categories by id for [`TaskResponse::new`].
#[must_use]
pub fn category_index(categories: &[Category]) -> HashMap<CategoryId, CategoryResponse> {
    categories
        .iter()
        .map(|category| (category.category_id.clone(), CategoryResponse::from(category)))
        .collect()
}

/// A selectable priority level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityChoice {
    /// Submitted value.
    pub value: &'static str,
    /// Display label.
    pub label: String,
}

impl PriorityChoice {
    /// All priority levels, lowest first.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Priority::ALL
            .iter()
            .map(|priority| Self {
                value: priority.as_str(),
                label: priority.to_string(),
            })
            .collect()
    }
}

/// Paging metadata with 1-based page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// Current page (1-based).
    pub number: u32,
    /// Number of pages, at least 1.
    pub total_pages: u64,
    /// Number of items across all pages.
    pub total_items: u64,
    /// Items per page.
    pub page_size: u32,
    /// Whether a next page exists.
    pub has_next: bool,
    /// Whether a previous page exists.
    pub has_previous: bool,
}

impl<T> From<&PaginatedResult<T>> for PageInfo {
    fn from(result: &PaginatedResult<T>) -> Self {
        Self {
            number: result.page + 1,
            total_pages: result.total_pages().max(1),
            total_items: result.total,
            page_size: result.page_size,
            has_next: result.has_next(),
            has_previous: result.has_previous(),
        }
    }
}

/// Data of the task list page.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListData {
    /// Tasks on this page.
    pub tasks: Vec<TaskResponse>,
    /// Paging metadata.
    pub page: PageInfo,
}

/// Data of the task detail and delete confirmation pages.
#[derive(Debug, Clone, Serialize)]
pub struct TaskData {
    /// The task.
    pub task: TaskResponse,
}

/// Data of the task create/update form page.
#[derive(Debug, Clone, Serialize)]
pub struct TaskFormData {
    /// Task being edited, absent when creating.
    pub task_id: Option<TaskId>,
    /// Submitted or pre-filled values.
    pub form: TaskForm,
    /// Field errors.
    pub errors: Vec<FieldError>,
    /// Category choices.
    pub categories: Vec<CategoryResponse>,
    /// Priority choices.
    pub priorities: Vec<PriorityChoice>,
}

impl TaskFormData {
    /// Builds form data with the category and priority choices.
    #[must_use]
    pub fn new(
        task_id: Option<TaskId>,
        form: TaskForm,
        errors: Vec<FieldError>,
        categories: &[Category],
    ) -> Self {
        Self {
            task_id,
            form,
            errors,
            categories: categories.iter().map(CategoryResponse::from).collect(),
            priorities: PriorityChoice::all(),
        }
    }
}

/// Data of the login and registration pages.
#[derive(Debug, Clone, Serialize)]
pub struct AuthFormData<F> {
    /// Submitted values, without passwords.
    pub form: F,
    /// Field errors.
    pub errors: Vec<FieldError>,
}

/// Data of the category list page.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryListData {
    /// All categories, ordered by name.
    pub categories: Vec<CategoryResponse>,
    /// Submitted values of the create form.
    pub form: CategoryForm,
    /// Field errors of the create form.
    pub errors: Vec<FieldError>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;

    fn task_form(title: &str) -> TaskForm {
        TaskForm {
            title: Some(title.to_string()),
            ..TaskForm::default()
        }
    }

    fn register_form(username: &str, password1: &str, password2: &str) -> RegisterForm {
        RegisterForm {
            username: Some(username.to_string()),
            email: None,
            password1: Some(password1.to_string()),
            password2: Some(password2.to_string()),
        }
    }

    fn field_names(error: &ValidationError) -> Vec<&str> {
        error.errors.iter().map(|error| error.field.as_str()).collect()
    }

    // -------------------------------------------------------------------------
    // Due Date Parsing Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("2024-06-01T09:30", 9, 30, 0)]
    #[case("2024-06-01T09:30:15", 9, 30, 15)]
    #[case("2024-06-01 09:30", 9, 30, 0)]
    #[case("2024-06-01T11:30:00+02:00", 9, 30, 0)]
    #[case("2024-06-01T09:30:00Z", 9, 30, 0)]
    fn test_parse_due_accepted_formats(
        #[case] input: &str,
        #[case] hour: u32,
        #[case] minute: u32,
        #[case] second: u32,
    ) {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, second).unwrap();
        assert_eq!(parse_due(input), Some(Timestamp::from_datetime(expected)));
    }

    #[rstest]
    #[case("tomorrow")]
    #[case("2024-13-01T09:30")]
    #[case("2024-06-01")]
    fn test_parse_due_rejects_garbage(#[case] input: &str) {
        assert!(parse_due(input).is_none());
    }

    // -------------------------------------------------------------------------
    // Task Form Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_task_form_minimal_defaults() {
        let input = task_form("  Buy milk  ").validate(&[]).unwrap();

        assert_eq!(input.title, "Buy milk");
        assert_eq!(input.priority, Priority::Low);
        assert!(input.description.is_none());
        assert!(input.due.is_none());
        assert!(input.category_id.is_none());
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_task_form_title_required(#[case] title: Option<&str>) {
        let form = TaskForm {
            title: title.map(ToString::to_string),
            ..TaskForm::default()
        };
        let error = form.validate(&[]).unwrap_err();
        assert_eq!(field_names(&error), vec!["title"]);
        assert_eq!(error.errors[0].message, REQUIRED);
    }

    #[rstest]
    fn test_task_form_collects_every_invalid_field() {
        let form = TaskForm {
            title: Some(String::new()),
            description: Some("details".to_string()),
            due: Some("someday".to_string()),
            priority: Some("urgent".to_string()),
            category: Some(CategoryId::generate().to_string()),
        };

        let error = form.validate(&[]).unwrap_err();
        assert_eq!(
            field_names(&error),
            vec!["title", "due", "priority", "category"]
        );
    }

    #[rstest]
    fn test_task_form_resolves_existing_category() {
        let category = Category::new(CategoryId::generate(), "Errands", Timestamp::now());
        let form = TaskForm {
            category: Some(category.category_id.to_string()),
            priority: Some("high".to_string()),
            ..task_form("Buy milk")
        };

        let input = form.validate(std::slice::from_ref(&category)).unwrap();
        assert_eq!(input.category_id, Some(category.category_id));
        assert_eq!(input.priority, Priority::High);
    }

    #[rstest]
    fn test_task_form_rejects_malformed_category() {
        let form = TaskForm {
            category: Some("42".to_string()),
            ..task_form("Buy milk")
        };
        assert!(form.validate(&[]).unwrap_err().has_error("category"));
    }

    #[rstest]
    fn test_task_form_from_task_round_trips() {
        let due = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap());
        let task = Task::new(TaskId::generate(), "Buy milk", Timestamp::now())
            .with_due(Some(due.clone()))
            .with_priority(Priority::Medium);

        let input = TaskForm::from_task(&task).validate(&[]).unwrap();
        assert_eq!(input.due, Some(due));
        assert_eq!(input.priority, Priority::Medium);
    }

    #[rstest]
    fn test_task_input_apply_keeps_completion_and_creation_time() {
        let created = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let task = Task::new(TaskId::generate(), "Old", created.clone()).with_complete(true);
        let now = Timestamp::now();

        let updated = task_form("New")
            .validate(&[])
            .unwrap()
            .apply(task, now.clone());

        assert_eq!(updated.title, "New");
        assert!(updated.complete);
        assert_eq!(updated.created_at, created);
        assert_eq!(updated.updated_at, now);
    }

    proptest! {
        #[test]
        fn title_within_limit_is_accepted(title in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,198}[a-zA-Z0-9]") {
            let input = task_form(&title).validate(&[]);
            prop_assert!(input.is_ok());
            prop_assert_eq!(input.unwrap().title, title);
        }

        #[test]
        fn title_over_limit_is_rejected(title in "[a-z]{201,260}") {
            let error = task_form(&title).validate(&[]).unwrap_err();
            prop_assert!(error.has_error("title"));
        }
    }

    // -------------------------------------------------------------------------
    // Registration Form Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_register_form_valid() {
        let mut form = register_form("alice.b+tag@home", "s3cret-pass", "s3cret-pass");
        form.email = Some("alice@example.com".to_string());

        let input = form.validate().unwrap();
        assert_eq!(input.username, "alice.b+tag@home");
        assert_eq!(input.email.as_deref(), Some("alice@example.com"));
        assert_eq!(input.password, "s3cret-pass");
    }

    #[rstest]
    #[case("alice smith")]
    #[case("alice!")]
    fn test_register_form_rejects_invalid_username(#[case] username: &str) {
        let error = register_form(username, "s3cret-pass", "s3cret-pass")
            .validate()
            .unwrap_err();
        assert_eq!(field_names(&error), vec!["username"]);
    }

    #[rstest]
    #[case("short1", PASSWORD_TOO_SHORT)]
    #[case("1234567890", PASSWORD_NUMERIC)]
    fn test_register_form_rejects_weak_password(#[case] password: &str, #[case] message: &str) {
        let error = register_form("alice", password, password)
            .validate()
            .unwrap_err();
        assert!(error.errors.iter().any(|error| error.message == message));
    }

    #[rstest]
    fn test_register_form_rejects_mismatch() {
        let error = register_form("alice", "s3cret-pass", "s3cret-past")
            .validate()
            .unwrap_err();
        assert_eq!(error.errors, vec![FieldError::new("password2", PASSWORD_MISMATCH)]);
    }

    #[rstest]
    #[case("alice")]
    #[case("@example.com")]
    #[case("alice@")]
    fn test_register_form_rejects_invalid_email(#[case] email: &str) {
        let mut form = register_form("alice", "s3cret-pass", "s3cret-pass");
        form.email = Some(email.to_string());
        assert!(form.validate().unwrap_err().has_error("email"));
    }

    #[rstest]
    fn test_register_form_without_passwords() {
        let form = register_form("alice", "s3cret-pass", "s3cret-pass").without_passwords();
        assert!(form.password1.is_none());
        assert!(form.password2.is_none());
        assert_eq!(form.username.as_deref(), Some("alice"));
    }

    // -------------------------------------------------------------------------
    // Login and Category Form Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_login_form_requires_both_fields() {
        let error = LoginForm::default().validate().unwrap_err();
        assert_eq!(field_names(&error), vec!["username", "password"]);
    }

    #[rstest]
    #[case(Some("  Errands "), Ok("Errands".to_string()))]
    #[case(Some(""), Err(vec!["name"]))]
    fn test_category_form_validate(
        #[case] name: Option<&str>,
        #[case] expected: Result<String, Vec<&str>>,
    ) {
        let form = CategoryForm {
            name: name.map(ToString::to_string),
        };
        let result = form.validate();
        match expected {
            Ok(expected) => assert_eq!(result.unwrap(), expected),
            Err(fields) => assert_eq!(field_names(&result.unwrap_err()), fields),
        }
    }

    // -------------------------------------------------------------------------
    // Response Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[case(Some("True"), true)]
    #[case(Some("False"), false)]
    #[case(Some("true"), false)]
    #[case(None, false)]
    fn test_complete_query_requested_state(#[case] raw: Option<&str>, #[case] expected: bool) {
        let query = CompleteQuery {
            complete: raw.map(ToString::to_string),
        };
        assert_eq!(query.requested_state(), expected);
    }

    #[rstest]
    fn test_task_response_resolves_category() {
        let category = Category::new(CategoryId::generate(), "Errands", Timestamp::now());
        let task = Task::new(TaskId::generate(), "Buy milk", Timestamp::now())
            .with_category(Some(category.category_id.clone()));

        let response = TaskResponse::new(&task, &category_index(&[category]));
        assert_eq!(
            response.category.map(|category| category.name),
            Some("Errands".to_string())
        );
    }

    #[rstest]
    fn test_page_info_is_one_based() {
        let result: PaginatedResult<i32> = PaginatedResult::new(vec![], 0, 0, 10);
        let info = PageInfo::from(&result);
        assert_eq!(info.number, 1);
        assert_eq!(info.total_pages, 1);
        assert!(!info.has_next);
    }
}
