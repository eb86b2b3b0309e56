//! Category domain model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Timestamp;

/// Unique identifier for a category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Creates a `CategoryId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new `CategoryId` with a randomly generated UUID (v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for CategoryId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A label grouping tasks.
///
/// Categories are shared between users. Deleting a category deletes every
/// task filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique external identifier for the category.
    pub category_id: CategoryId,
    /// Display name (at most 200 characters).
    pub name: String,
    /// Timestamp when the category was created.
    pub created_at: Timestamp,
    /// Timestamp when the category was last updated.
    pub updated_at: Timestamp,
}

impl Category {
    /// Maximum length of a category name, in characters.
    pub const NAME_MAX_LENGTH: usize = 200;

    /// Creates a new category.
    #[must_use]
    pub fn new(category_id: CategoryId, name: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            category_id,
            name: name.into(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
