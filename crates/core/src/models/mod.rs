//! Domain models shared by every backend.
//!
//! These mirror the three tables of the remote store (`companies`, `users`,
//! `dashboard_data`) plus the composite results returned by the auth
//! operations. They are plain data: validation lives in the data access
//! layer and persistence lives in the backends.

pub mod company;
pub mod dashboard;
pub mod user;

pub use company::{Company, CompanySettingsInput};
pub use dashboard::DashboardData;
pub use user::{AppUser, LoginResult, SignupResult};
