//! Dashboard page: the latest snapshot of the active company.

use std::sync::Arc;

use saas_dashboard_core::{CompanyId, DashboardData, DashboardDataId};
use tracing::debug;

use super::{AppContext, Lifecycle, NO_SESSION_MESSAGE, PageCell, PageState};

/// Shown when the company has no snapshot yet.
pub const NO_DATA_MESSAGE: &str = "No dashboard data available yet.";

/// Page heading.
pub const TITLE: &str = "Dashboard";
/// Line under the heading.
pub const SUBTITLE: &str = "High-level metrics and data for your company.";

/// What the dashboard shows once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardView {
    /// The company has no snapshot.
    Empty,
    /// The most recent snapshot.
    Snapshot(SnapshotView),
}

impl DashboardView {
    /// The placeholder text of an empty dashboard.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Empty => Some(NO_DATA_MESSAGE),
            Self::Snapshot(_) => None,
        }
    }
}

/// Display form of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotView {
    pub company_id: CompanyId,
    pub record_id: DashboardDataId,
    /// Local time, human readable.
    pub created_at: String,
    /// String payloads verbatim, anything else pretty-printed.
    pub payload: String,
}

impl From<&DashboardData> for SnapshotView {
    fn from(data: &DashboardData) -> Self {
        Self {
            company_id: data.company_id,
            record_id: data.id,
            created_at: data
                .created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            payload: data.pretty_payload(),
        }
    }
}

struct Inner {
    lifecycle: Lifecycle,
    view: PageCell<DashboardView>,
}

/// Controller of the dashboard page.
#[derive(Clone)]
pub struct DashboardPage {
    ctx: AppContext,
    inner: Arc<Inner>,
}

impl DashboardPage {
    /// Mount the page. It starts out `Loading`; call [`Self::load`].
    #[must_use]
    pub fn mount(ctx: AppContext) -> Self {
        let lifecycle = Lifecycle::new();
        let view = lifecycle.cell(PageState::Loading);
        Self {
            ctx,
            inner: Arc::new(Inner { lifecycle, view }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PageState<DashboardView> {
        self.inner.view.get()
    }

    /// Follow state changes.
    #[must_use]
    pub fn watch(&self) -> tokio::sync::watch::Receiver<PageState<DashboardView>> {
        self.inner.view.watch()
    }

    /// Whether the page is still mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.lifecycle.is_mounted()
    }

    /// Unmount the page; in-flight loads are discarded.
    pub fn unmount(&self) {
        self.inner.lifecycle.unmount();
    }

    /// Load the snapshot of the company in the session.
    pub async fn load(&self) {
        let ticket = self.inner.view.start();

        let Some(company_id) = self.ctx.session.company_id() else {
            self.inner
                .view
                .finish(ticket, PageState::Error(NO_SESSION_MESSAGE.to_string()));
            return;
        };

        let state = match self.ctx.data.fetch_dashboard_data(company_id).await {
            Ok(Some(data)) => PageState::Success(DashboardView::Snapshot((&data).into())),
            Ok(None) => PageState::Success(DashboardView::Empty),
            Err(e) => PageState::Error(e.user_message()),
        };

        if !self.inner.view.finish(ticket, state) {
            debug!(company_id = %company_id, "Discarded dashboard result");
        }
    }

    /// Reload whenever another tab changes the active company, until the
    /// page is unmounted.
    pub async fn follow_session(&self) {
        let mut subscription = self.ctx.session.subscribe();
        loop {
            tokio::select! {
                () = self.inner.lifecycle.unmounted() => return,
                company = subscription.changed() => {
                    debug!(company_id = ?company, "Session changed in another tab");
                    self.load().await;
                }
            }
        }
    }
}
