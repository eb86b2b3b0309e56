//! Tasks, their identifiers and priorities, and the `Timestamp` shared by
//! every entity.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::category::CategoryId;
use super::user::UserId;

// =============================================================================
// Identifiers and time
// =============================================================================

/// Public handle of a task, used in every `/task/{id}` URL.
///
/// Random v4 UUIDs keep other users' tasks from being found by counting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.parse().map(Self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, formatter)
    }
}

/// A UTC instant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    #[must_use]
    pub const fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0.to_rfc3339())
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Error returned when a priority string is not one of the known levels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid priority")]
pub struct ParsePriorityError(pub String);

/// How urgent a task is. Compares from `Low` up to `High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// All priority levels, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Lowercase code stored in the database and submitted by forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == code)
            .ok_or_else(|| ParsePriorityError(code.to_owned()))
    }
}

/// Capitalised label shown in the priority drop-down.
impl fmt::Display for Priority {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

// =============================================================================
// Task
// =============================================================================

/// A to-do item.
///
/// A task optionally belongs to a [`Category`](super::Category) and is owned
/// by exactly one user. The owner is only absent for legacy or seeded rows.
///
/// # Examples
///
/// ```
/// use task_tracker::domain::{Priority, Task, TaskId, Timestamp};
///
/// let task = Task::new(TaskId::generate(), "Buy milk", Timestamp::now())
///     .with_priority(Priority::High);
///
/// assert!(!task.complete);
/// assert_eq!(task.priority, Priority::High);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    /// At most [`Task::TITLE_MAX_LENGTH`] characters, never blank.
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    pub due: Option<Timestamp>,
    pub priority: Priority,
    pub category_id: Option<CategoryId>,
    pub owner_id: Option<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub const TITLE_MAX_LENGTH: usize = 200;

    /// An open, low-priority task with no due date, category or owner,
    /// created and last touched at `created_at`.
    #[must_use]
    pub fn new(task_id: TaskId, title: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            task_id,
            title: title.into(),
            description: None,
            complete: false,
            due: None,
            priority: Priority::default(),
            category_id: None,
            owner_id: None,
            updated_at: created_at.clone(),
            created_at,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_due(mut self, due: Option<Timestamp>) -> Self {
        self.due = due;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    #[must_use]
    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Marks the task as modified at `touched_at`.
    #[must_use]
    pub fn with_updated_at(mut self, touched_at: Timestamp) -> Self {
        self.updated_at = touched_at;
        self
    }

    /// Ownerless tasks belong to nobody.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user_id)
    }

    #[must_use]
    pub fn is_in_category(&self, category_id: &CategoryId) -> bool {
        self.category_id.as_ref() == Some(category_id)
    }

    /// Ordering used by task listings.
    ///
    /// Latest due date first; tasks without a due date come after all dated
    /// tasks. Ties are broken by newest creation time, then by id so the
    /// order is total.
    #[must_use]
    pub fn listing_order(left: &Self, right: &Self) -> Ordering {
        let by_due = match (&left.due, &right.due) {
            (Some(left_due), Some(right_due)) => right_due.cmp(left_due),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        by_due
            .then_with(|| right.created_at.cmp(&left.created_at))
            .then_with(|| left.task_id.cmp(&right.task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn on_day(day: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap())
    }

    fn task_due(title: &str, created: u32, due: Option<u32>) -> Task {
        Task::new(TaskId::generate(), title, on_day(created)).with_due(due.map(on_day))
    }

    #[rstest]
    fn generated_ids_are_distinct_v4_uuids() {
        let first = TaskId::generate();
        let second = TaskId::generate();

        assert_ne!(first, second);
        assert_eq!(first.as_uuid().get_version_num(), 4);
        assert_eq!(first.to_string().parse::<TaskId>().unwrap(), first);
    }

    #[rstest]
    #[case("")]
    #[case("42")]
    #[case("not-a-uuid")]
    fn malformed_ids_do_not_parse(#[case] raw: &str) {
        assert!(raw.parse::<TaskId>().is_err());
    }

    #[rstest]
    #[case("low", Priority::Low, "Low")]
    #[case("medium", Priority::Medium, "Medium")]
    #[case("high", Priority::High, "High")]
    fn priority_codes_and_labels(
        #[case] code: &str,
        #[case] priority: Priority,
        #[case] label: &str,
    ) {
        assert_eq!(code.parse::<Priority>(), Ok(priority));
        assert_eq!(priority.as_str(), code);
        assert_eq!(priority.to_string(), label);
    }

    #[rstest]
    #[case("High")]
    #[case("urgent")]
    #[case("")]
    fn unknown_priority_codes_are_refused(#[case] raw: &str) {
        assert_eq!(
            raw.parse::<Priority>(),
            Err(ParsePriorityError(raw.to_owned()))
        );
    }

    #[rstest]
    fn priorities_rank_low_to_high() {
        assert_eq!(Priority::default(), Priority::Low);
        let mut shuffled = [Priority::High, Priority::Low, Priority::Medium];
        shuffled.sort();
        assert_eq!(shuffled, Priority::ALL);
    }

    #[rstest]
    fn new_task_starts_open_and_unassigned() {
        let created = on_day(9);
        let task = Task::new(TaskId::generate(), "Buy milk", created.clone());

        assert_eq!(task.title, "Buy milk");
        assert!(!task.complete);
        assert_eq!(task.due, None);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.category_id, None);
        assert_eq!(task.owner_id, None);
        assert_eq!(task.created_at, created);
        assert_eq!(task.updated_at, created);
    }

    #[rstest]
    fn only_the_recorded_owner_owns_a_task() {
        let owner = UserId::generate();
        let owned = Task::new(TaskId::generate(), "Mine", on_day(1)).with_owner(owner.clone());
        let orphan = Task::new(TaskId::generate(), "Nobody's", on_day(1));

        assert!(owned.is_owned_by(&owner));
        assert!(!owned.is_owned_by(&UserId::generate()));
        assert!(!orphan.is_owned_by(&owner));
    }

    #[rstest]
    fn listing_puts_latest_due_first_and_undated_last() {
        let mut tasks = vec![
            task_due("undated", 2, None),
            task_due("early", 1, Some(5)),
            task_due("late", 1, Some(20)),
        ];

        tasks.sort_by(Task::listing_order);

        let titles: Vec<&str> = tasks.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, ["late", "early", "undated"]);
    }

    #[rstest]
    #[case(Some(4))]
    #[case(None)]
    fn equal_due_dates_fall_back_to_newest_created(#[case] due: Option<u32>) {
        let older = task_due("older", 1, due);
        let newer = task_due("newer", 3, due);

        assert_eq!(Task::listing_order(&newer, &older), Ordering::Less);
        assert_eq!(Task::listing_order(&older, &newer), Ordering::Greater);
    }
}
