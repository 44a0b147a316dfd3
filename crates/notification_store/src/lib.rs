//! # Notification Store
//!
//! Durable storage for user notifications: the entity types, the
//! [`NotificationStore`] trait, and its in-memory and PostgreSQL implementations.

/// In-process store used without a database and in tests.
pub mod memory;
/// PostgreSQL-backed store.
pub mod pg;
/// The storage trait.
pub mod store;
/// Notification entity, inputs and errors.
pub mod types;

pub use memory::InMemoryNotificationStore;
pub use pg::PgNotificationStore;
pub use store::NotificationStore;
pub use types::*;
