//! Session identity resolver.
//!
//! The session is the association of this client with a company and a
//! user. It lives in client storage under three keys:
//!
//! | Key | Value |
//! |-----|-------|
//! | `companyId` | decimal company ID |
//! | `userId` | decimal user ID |
//! | `sessionEstablishedAt` | RFC 3339 timestamp |
//!
//! [`SessionContext`] is passed explicitly to everything that needs the
//! session. Reads are synchronous. Values that do not parse read as absent;
//! so does a session older than the configured maximum age, which is cleared
//! on the way.
//!
//! Changes made by other tabs reach a [`CompanySubscription`]. Consistency
//! across tabs is eventual and last-writer-wins.

pub mod storage;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use saas_dashboard_core::{CompanyId, UserId};

pub use storage::{
    FileStore, KeyValueStore, MemoryStore, SharedStorage, StorageError, StorageEvent, TabEvents,
    TabEventsError, TabId, TabStorage,
};

/// Storage key of the active company ID.
pub const COMPANY_ID_KEY: &str = "companyId";
/// Storage key of the active user ID.
pub const USER_ID_KEY: &str = "userId";
/// Storage key of the session establishment time.
pub const ESTABLISHED_AT_KEY: &str = "sessionEstablishedAt";

/// Default maximum session age (30 days).
pub const DEFAULT_MAX_AGE_HOURS: i64 = 720;

/// Errors from session writes.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The storage area could not be accessed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// How long an established session stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    max_age: Option<Duration>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::expires_after(Duration::hours(DEFAULT_MAX_AGE_HOURS))
    }
}

impl SessionPolicy {
    /// Sessions stay valid until cleared.
    #[must_use]
    pub const fn never_expires() -> Self {
        Self { max_age: None }
    }

    /// Sessions expire `max_age` after they were established.
    #[must_use]
    pub const fn expires_after(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
        }
    }

    /// The maximum age, if sessions expire.
    #[must_use]
    pub const fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Whether a session established at `established_at` is expired at `now`.
    ///
    /// Under an expiring policy a session with no readable establishment
    /// time counts as expired.
    #[must_use]
    pub fn is_expired(&self, established_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self.max_age, established_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(max_age), Some(at)) => now - at > max_age,
        }
    }
}

/// The session of one tab.
///
/// Cheap to clone; clones act for the same tab.
#[derive(Debug, Clone)]
pub struct SessionContext {
    tab: TabStorage,
    policy: SessionPolicy,
}

impl SessionContext {
    /// Bind a session to a tab.
    #[must_use]
    pub const fn new(tab: TabStorage, policy: SessionPolicy) -> Self {
        Self { tab, policy }
    }

    /// A session over a fresh in-memory storage area. Handy for tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(SharedStorage::memory().open_tab(), SessionPolicy::default())
    }

    /// The tab this session belongs to.
    #[must_use]
    pub const fn tab(&self) -> &TabStorage {
        &self.tab
    }

    /// The expiry policy.
    #[must_use]
    pub const fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Record a successful login or signup.
    ///
    /// The timestamp is written first and `companyId` last, so tabs reacting
    /// to `companyId` already see the matching user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if storage cannot be written.
    pub fn establish(&self, company_id: CompanyId, user_id: UserId) -> Result<(), SessionError> {
        self.tab
            .set(ESTABLISHED_AT_KEY, &Utc::now().to_rfc3339())?;
        self.tab.set(USER_ID_KEY, &user_id.to_string())?;
        self.tab.set(COMPANY_ID_KEY, &company_id.to_string())?;

        info!(company_id = %company_id, user_id = %user_id, "Session established");
        Ok(())
    }

    /// Log out: remove every session key.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if storage cannot be written.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.tab.remove(COMPANY_ID_KEY)?;
        self.tab.remove(USER_ID_KEY)?;
        self.tab.remove(ESTABLISHED_AT_KEY)?;
        Ok(())
    }

    /// The active company, if a valid session exists.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyId> {
        self.read_id(COMPANY_ID_KEY)
    }

    /// The active user, if a valid session exists.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.read_id(USER_ID_KEY)
    }

    /// When the session was established.
    #[must_use]
    pub fn established_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.read_raw(ESTABLISHED_AT_KEY)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .ok()
    }

    /// Follow `companyId` as other tabs change it.
    #[must_use]
    pub fn subscribe(&self) -> CompanySubscription {
        // Subscribe before reading so no change slips in between.
        let events = self.tab.events();
        CompanySubscription {
            current: self.company_id(),
            session: self.clone(),
            events,
        }
    }

    fn read_id<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        if self.expire_if_stale() {
            return None;
        }

        match raw.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(key, value = %raw, "Ignoring malformed session value");
                None
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.tab.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Session storage unreadable");
                None
            }
        }
    }

    /// Clear the session if it is past its maximum age.
    fn expire_if_stale(&self) -> bool {
        if !self.policy.is_expired(self.established_at(), Utc::now()) {
            return false;
        }

        info!("Session expired");
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear expired session");
        }
        true
    }
}

/// The active company of a session, kept current across tabs.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct CompanySubscription {
    session: SessionContext,
    events: TabEvents,
    current: Option<CompanyId>,
}

impl CompanySubscription {
    /// The company as of the last observed change.
    #[must_use]
    pub const fn current(&self) -> Option<CompanyId> {
        self.current
    }

    /// Wait until another tab changes the active company and return the new
    /// value.
    pub async fn changed(&mut self) -> Option<CompanyId> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.key != COMPANY_ID_KEY => continue,
                // Only fires on an actual change made by another tab.
                Ok(_) => {
                    self.current = self.session.company_id();
                    return self.current;
                }
                Err(TabEventsError::Lagged(_)) => {
                    let latest = self.session.company_id();
                    if latest != self.current {
                        self.current = latest;
                        return latest;
                    }
                }
                // The subscription holds a tab handle, so the area outlives it.
                Err(TabEventsError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}
