//! Shared wire definitions for the `TechFlow` REST API.
//!
//! The service speaks snake_case JSON. Domain types in this crate serialize
//! as camelCase, and [`case`] converts between the two shapes.

pub mod auth;
pub mod case;
pub mod error;
pub mod id;
pub mod optimistic;
pub mod project;
pub mod task;
pub mod team;

pub use id::Id;
