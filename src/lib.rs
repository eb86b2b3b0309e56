//! Task Tracker Library
//!
//! This library provides the core functionality of a personal task tracker:
//! per-user tasks with priorities, due dates and categories, behind
//! session-cookie authentication.

pub mod api;
pub mod domain;
pub mod infrastructure;
