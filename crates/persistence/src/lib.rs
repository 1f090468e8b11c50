//! Persistence layer for the Shopping Reminder backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//!
//! Every soft-deletable table is read through queries that filter
//! `is_deleted = FALSE`; only explicitly named `*_any` methods see
//! tombstoned rows. Deletes are always rewritten to tombstone updates.

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

/// Embedded SQL migrations, applied with [`db::run_migrations`].
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
