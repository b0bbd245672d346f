//! SaaS Dashboard Core - Shared domain types.
//!
//! This crate provides the types shared by every SaaS dashboard component:
//! - `client` - Data access, session resolution and page controllers
//! - `cli` - Terminal front end and database migrations
//! - `integration-tests` - Cross-crate test suites
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails and integration secrets
//! - [`models`] - Companies, users, dashboard snapshots and operation results

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
