//! # Taskboard Shared Library
//!
//! Domain types and the access-control core shared by the Taskboard API
//! server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Users, projects, memberships and tasks (with their SQL)
//! - `auth`: Credentials, tokens, and the ownership/membership evaluator
//! - `store`: Persistence trait with PostgreSQL and in-memory backends
//! - `services`: Gated project and task operations
//! - `events`: Fire-and-forget change notifications
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod events;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
