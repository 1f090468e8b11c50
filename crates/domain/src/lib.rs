//! Domain layer for the Shopping Reminder backend.
//!
//! This crate contains:
//! - Domain models (Group, Invitation, ShoppingList, ShoppingItem, ...)
//! - The group role/permission matrix
//! - Pure business rules (invitation resolution, reorder planning,
//!   purchase-cadence math)

pub mod models;
