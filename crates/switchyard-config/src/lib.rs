//! # Switchyard Config
//!
//! Type-safe configuration management for Switchyard.
//!
//! This crate provides configuration loading, validation, and caching
//! with support for atomic updates.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod defaults;
pub mod loader;
pub mod schema;

pub use cache::*;
pub use defaults::*;
pub use loader::*;
pub use schema::*;
