//! `TechFlow` project and task management client library.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod pagination;
pub mod poller;
pub mod render;
pub mod search;
pub mod session;
pub mod tasks;
