//! SaaS Dashboard client library.
//!
//! Everything the front end needs between a page and the remote store:
//!
//! - [`access`] - The canonical data access interface (`DataAccess`)
//! - [`backend`] - Swappable backends: in-memory stub, REST, direct Postgres
//! - [`session`] - Client-side session identity shared across tabs
//! - [`pages`] - Page controllers and the navigation shell
//! - [`config`] - Environment configuration
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let backend = backend::connect(&config).await?;
//! let storage = SharedStorage::file(&config.session.file)?;
//! let session = SessionContext::new(storage.open_tab(), config.session.policy);
//! let ctx = AppContext::new(DataAccess::new(backend), session);
//!
//! let dashboard = DashboardPage::mount(ctx.clone());
//! dashboard.load().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod admin;
pub mod backend;
pub mod config;
pub mod error;
pub mod pages;
pub mod password;
pub mod session;

pub use access::DataAccess;
pub use admin::AdminCapability;
pub use config::{BackendKind, ClientConfig, ConfigError};
pub use error::DataAccessError;
pub use pages::AppContext;
pub use session::{SessionContext, SharedStorage};
