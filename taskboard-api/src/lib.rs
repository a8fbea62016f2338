//! # Taskboard API Server Library
//!
//! HTTP surface over the project/task access core in `taskboard-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state, JWT layer and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
