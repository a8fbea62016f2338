/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, user directory
/// - `projects`: Project CRUD and team replacement
/// - `tasks`: Task CRUD under a project
/// - `events`: Server-sent live updates

pub mod auth;
pub mod events;
pub mod health;
pub mod projects;
pub mod tasks;
