//! Core types for the SaaS dashboard.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod id;

pub use credential::{IntegrationSecret, PasswordHash};
pub use email::{Email, EmailError};
pub use id::*;
