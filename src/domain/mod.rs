//! Domain module for task tracking.
//!
//! This module contains domain models and value objects.

pub mod category;
pub mod task;
pub mod user;

pub use category::{Category, CategoryId};
pub use task::{ParsePriorityError, Priority, Task, TaskId, Timestamp};
pub use user::{Identity, Session, SessionToken, User, UserId};
