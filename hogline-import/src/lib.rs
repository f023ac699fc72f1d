//! hogline-import library interface
//!
//! Order-import reconciliation for the club database: parses a curling.io
//! order-item export, matches line items to catalog products, creates or
//! updates users and memberships idempotently, and writes an audit log.
//!
//! Exposed as a library so the integration tests can drive the full
//! pipeline against an in-memory database.

pub mod db;
pub mod import;
pub mod mapping;
pub mod report;
pub mod status;
