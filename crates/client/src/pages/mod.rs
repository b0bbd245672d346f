//! Page controllers.
//!
//! A page controller owns the UI state of one page and exposes it as a
//! [`PageState`] that a renderer can read or watch. Controllers are cheap
//! to clone; clones drive the same page, so a renderer can hand one to a
//! background task and keep another.
//!
//! # Lifecycle
//!
//! A controller is mounted when created. After [`Lifecycle::unmount`] every
//! result that is still in flight is dropped instead of applied. Each
//! [`PageCell`] also tracks which load is the latest, so a slow response to
//! an older request never overwrites a newer one.
//!
//! # Pages
//!
//! - [`home`] - Landing page with the two entry actions
//! - [`nav`] - Navigation shell shown on every page
//! - [`login`] / [`signup`] - Credential forms
//! - [`dashboard`] - Latest dashboard snapshot of the active company
//! - [`settings`] - Shopify credentials of the active company

pub mod dashboard;
pub mod home;
pub mod login;
pub mod nav;
pub mod settings;
pub mod signup;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::access::DataAccess;
use crate::session::SessionContext;

pub use dashboard::{DashboardPage, DashboardView, SnapshotView};
pub use home::HomePage;
pub use login::{LoginForm, LoginPage};
pub use nav::{NavLink, Navigation, Route};
pub use settings::{SettingsForm, SettingsPage};
pub use signup::{SignupForm, SignupPage};

/// Shown when a page needs a session and there is none.
pub const NO_SESSION_MESSAGE: &str = "No company ID found. Please sign in again.";

/// Everything a page controller needs.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Data access, wired to establish sessions in `session`.
    pub data: DataAccess,
    /// Session of the tab the pages render in.
    pub session: SessionContext,
}

impl AppContext {
    /// Build a context. Logins and signups through `data` will establish
    /// `session`.
    #[must_use]
    pub fn new(data: DataAccess, session: SessionContext) -> Self {
        Self {
            data: data.with_session(session.clone()),
            session,
        }
    }
}

/// State of an asynchronous page section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState<T> {
    /// Nothing requested yet.
    Idle,
    /// A request is outstanding.
    Loading,
    /// The last request succeeded.
    Success(T),
    /// The last request failed; the message is ready for display.
    Error(String),
}

impl<T> PageState<T> {
    /// Whether a request is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The successful value, if any.
    #[must_use]
    pub const fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The error message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Mounted flag shared by every section of a page.
#[derive(Debug)]
pub struct Lifecycle {
    mounted: watch::Sender<bool>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// A mounted lifecycle.
    #[must_use]
    pub fn new() -> Self {
        let (mounted, _) = watch::channel(true);
        Self { mounted }
    }

    /// Whether the page is still mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        *self.mounted.borrow()
    }

    /// Unmount the page. Results still in flight are discarded.
    pub fn unmount(&self) {
        self.mounted.send_replace(false);
    }

    /// Resolve once the page is unmounted.
    pub async fn unmounted(&self) {
        let mut rx = self.mounted.subscribe();
        // The sender lives in `self`, so the channel cannot close first.
        let _ = rx.wait_for(|mounted| !*mounted).await;
    }

    /// A state cell tied to this lifecycle.
    #[must_use]
    pub fn cell<T>(&self, initial: PageState<T>) -> PageCell<T> {
        let (state, _) = watch::channel(initial);
        PageCell {
            state,
            mounted: self.mounted.subscribe(),
            generation: AtomicU64::new(0),
            busy: AtomicBool::new(false),
        }
    }
}

/// Identifies one load of a [`PageCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// One independently loading section of a page.
#[derive(Debug)]
pub struct PageCell<T> {
    state: watch::Sender<PageState<T>>,
    mounted: watch::Receiver<bool>,
    generation: AtomicU64,
    busy: AtomicBool,
}

impl<T: Clone> PageCell<T> {
    /// Snapshot of the current state.
    #[must_use]
    pub fn get(&self) -> PageState<T> {
        self.state.borrow().clone()
    }

    /// Follow state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<PageState<T>> {
        self.state.subscribe()
    }

    /// Whether a submission is in flight; the triggering control should be
    /// disabled while this is true.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Enter `Loading` for a new load and return its ticket.
    pub fn start(&self) -> Ticket {
        let ticket = Ticket(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
        self.apply(PageState::Loading);
        ticket
    }

    /// Apply the outcome of a load.
    ///
    /// Returns `false` (and changes nothing) if the page was unmounted or a
    /// newer load has started since.
    pub fn finish(&self, ticket: Ticket, state: PageState<T>) -> bool {
        if self.generation.load(Ordering::Acquire) != ticket.0 {
            return false;
        }
        self.apply(state)
    }

    /// Overwrite the state outside of a load.
    pub fn set(&self, state: PageState<T>) -> bool {
        self.apply(state)
    }

    /// Begin a user submission, or `None` if one is already in flight.
    pub fn try_submit(&self) -> Option<Submission<'_, T>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        Some(Submission {
            ticket: self.start(),
            cell: self,
        })
    }

    fn apply(&self, state: PageState<T>) -> bool {
        if !*self.mounted.borrow() {
            return false;
        }
        self.state.send_replace(state);
        true
    }
}

/// An in-flight submission. Dropping it re-enables the control.
#[derive(Debug)]
pub struct Submission<'a, T: Clone> {
    cell: &'a PageCell<T>,
    ticket: Ticket,
}

impl<T: Clone> Submission<'_, T> {
    /// Apply the outcome and release the in-flight flag.
    pub fn finish(self, state: PageState<T>) -> bool {
        self.cell.finish(self.ticket, state)
    }
}

impl<T: Clone> Drop for Submission<'_, T> {
    fn drop(&mut self) {
        self.cell.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Backends and helpers shared by the page tests.

    use std::sync::Arc;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use tokio::sync::Semaphore;

    use saas_dashboard_core::{
        Company, CompanyId, CompanySettingsInput, DashboardData, Email, LoginResult, SignupResult,
    };

    use super::AppContext;
    use crate::access::DataAccess;
    use crate::admin::AdminCapability;
    use crate::backend::{Backend, InMemoryBackend, NewAccount};
    use crate::error::Result;
    use crate::password::CredentialHasher;
    use crate::session::SessionContext;

    /// An in-memory backend whose calls wait for [`Gate::open`].
    pub struct GatedBackend {
        inner: Arc<InMemoryBackend>,
        gate: Arc<Semaphore>,
    }

    /// Releases calls held by a [`GatedBackend`].
    #[derive(Clone)]
    pub struct Gate(Arc<Semaphore>);

    impl Gate {
        /// Let `n` more calls through.
        pub fn open(&self, n: usize) {
            self.0.add_permits(n);
        }
    }

    impl GatedBackend {
        async fn pass(&self) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }

    #[async_trait]
    impl Backend for GatedBackend {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn signup(&self, account: &NewAccount) -> Result<SignupResult> {
            self.pass().await;
            self.inner.signup(account).await
        }

        async fn login(&self, email: &Email, password: &SecretString) -> Result<LoginResult> {
            self.pass().await;
            self.inner.login(email, password).await
        }

        async fn fetch_dashboard_data(
            &self,
            company_id: CompanyId,
        ) -> Result<Option<DashboardData>> {
            self.pass().await;
            self.inner.fetch_dashboard_data(company_id).await
        }

        async fn fetch_company_settings(&self, company_id: CompanyId) -> Result<Option<Company>> {
            self.pass().await;
            self.inner.fetch_company_settings(company_id).await
        }

        async fn save_company_settings(
            &self,
            company_id: CompanyId,
            settings: &CompanySettingsInput,
        ) -> Result<Company> {
            self.pass().await;
            self.inner.save_company_settings(company_id, settings).await
        }

        async fn fetch_companies(&self, admin: &AdminCapability) -> Result<Vec<Company>> {
            self.pass().await;
            self.inner.fetch_companies(admin).await
        }
    }

    pub fn memory_backend() -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::with_hasher(CredentialHasher::minimal()))
    }

    /// A context over a plain in-memory backend.
    pub fn context(backend: Arc<InMemoryBackend>) -> AppContext {
        AppContext::new(DataAccess::new(backend), SessionContext::in_memory())
    }

    /// A context whose backend calls block until the gate opens.
    pub fn gated_context(backend: Arc<InMemoryBackend>) -> (AppContext, Gate) {
        let gate = Arc::new(Semaphore::new(0));
        let gated = GatedBackend {
            inner: backend,
            gate: Arc::clone(&gate),
        };
        let ctx = AppContext::new(
            DataAccess::new(Arc::new(gated)),
            SessionContext::in_memory(),
        );
        (ctx, Gate(gate))
    }
}
