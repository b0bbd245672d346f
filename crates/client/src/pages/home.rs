//! Landing page.

use super::nav::{Route, route_path};

/// Page title.
pub const TITLE: &str = "B2B SaaS Dashboard";
/// Introductory text.
pub const DESCRIPTION: &str =
    "Welcome to your B2B SaaS Dashboard. Get started by logging in or signing up.";

/// A call to action on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub label: &'static str,
    pub route: Route,
}

impl Action {
    /// Path the action leads to.
    #[must_use]
    pub const fn href(&self) -> &'static str {
        route_path(self.route)
    }
}

/// The landing page. It has no state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HomePage;

impl HomePage {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        TITLE
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        DESCRIPTION
    }

    /// Login first, then Sign Up.
    #[must_use]
    pub const fn actions(&self) -> [Action; 2] {
        [
            Action {
                label: "Login",
                route: Route::Login,
            },
            Action {
                label: "Sign Up",
                route: Route::Signup,
            },
        ]
    }
}
