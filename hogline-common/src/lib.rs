//! # Hogline Common Library
//!
//! Shared code for the Hogline club-management tools including:
//! - Database initialization, schema, and migrations
//! - Domain models (seasons, products, users, memberships)
//! - Money parsing and formatting (integer cents)
//! - Configuration and data-directory resolution
//! - Placeholder credential helpers

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod money;

pub use error::{Error, Result};
