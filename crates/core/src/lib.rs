//! Transport-free command surface for the Shopping Reminder backend.
//!
//! This crate wires the domain rules and repositories into services that an
//! external transport layer (HTTP, gRPC, CLI) can call directly. It owns:
//! - the error taxonomy returned to callers,
//! - the capability traits the services consume (`Clock`, `TokenIssuer`,
//!   `PasswordVerifier`, `Notifier`) and their default implementations,
//! - configuration loading,
//! - the purchase-history background recorder.

pub mod capabilities;
pub mod config;
pub mod error;
pub mod services;

pub use error::CoreError;
