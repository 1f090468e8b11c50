//! Shared utilities and common types for the Shopping Reminder backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Opaque token and invite code generation
//! - Password hashing with Argon2id
//! - JWT access token issuing and validation
//! - Common validation logic
//! - Pagination helpers

pub mod jwt;
pub mod pagination;
pub mod password;
pub mod token;
pub mod validation;
