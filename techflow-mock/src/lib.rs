//! In-memory mock of the `TechFlow` REST API.
//!
//! Exposes the mock server for use in integration tests and local demos.
//! The server keeps accounts, projects, and tasks in memory and speaks the
//! same snake_case JSON as the real service.

pub mod config;
pub mod server;
pub mod store;
