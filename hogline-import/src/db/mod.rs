//! Database queries for the import pipeline

pub mod memberships;
pub mod products;
pub mod seasons;
pub mod users;
