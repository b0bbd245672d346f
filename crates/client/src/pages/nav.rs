//! Navigation shell.

/// Pages reachable from the navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Signup,
    Dashboard,
    Settings,
}

/// Path of a route.
#[must_use]
pub const fn route_path(route: Route) -> &'static str {
    match route {
        Route::Home => "/",
        Route::Login => "/login",
        Route::Signup => "/signup",
        Route::Dashboard => "/dashboard",
        Route::Settings => "/settings",
    }
}

impl Route {
    /// Route for a path, ignoring a trailing slash.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        [
            Self::Home,
            Self::Login,
            Self::Signup,
            Self::Dashboard,
            Self::Settings,
        ]
        .into_iter()
        .find(|r| route_path(*r).trim_end_matches('/') == trimmed)
    }
}

/// One link in the navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub route: Route,
}

impl NavLink {
    #[must_use]
    pub const fn href(&self) -> &'static str {
        route_path(self.route)
    }
}

const LINKS: [NavLink; 4] = [
    NavLink {
        label: "Login",
        route: Route::Login,
    },
    NavLink {
        label: "Signup",
        route: Route::Signup,
    },
    NavLink {
        label: "Dashboard",
        route: Route::Dashboard,
    },
    NavLink {
        label: "Settings",
        route: Route::Settings,
    },
];

/// The static navigation bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation;

impl Navigation {
    /// The brand link back to the landing page.
    #[must_use]
    pub const fn brand(&self) -> NavLink {
        NavLink {
            label: "SaaS Dashboard",
            route: Route::Home,
        }
    }

    /// Menu links in display order.
    #[must_use]
    pub const fn links(&self) -> &'static [NavLink] {
        &LINKS
    }
}
