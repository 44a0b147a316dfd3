//! # Postgres
//!
//! This crate provides the connection pool and schema bootstrap for the
//! notification service's PostgreSQL database.

/// Connection pool creation and connectivity check.
pub mod database;
/// Idempotent creation of the tables and indexes the service needs.
pub mod schema;
