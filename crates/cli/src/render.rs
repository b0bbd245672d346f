//! Plain-text rendering of pages.
//!
//! Every function returns the text instead of printing it, so the layout can
//! be tested without a terminal.

use std::fmt::Write as _;

use saas_dashboard_client::pages::{
    DashboardView, HomePage, Navigation, PageState, SettingsForm, dashboard, signup,
};
use saas_dashboard_core::{Company, LoginResult, SignupResult};

const LOADING: &str = "Loading...";

#[must_use]
pub fn home(page: &HomePage) -> String {
    let mut out = format!("{}\n\n{}\n\n", page.title(), page.description());
    for action in page.actions() {
        let _ = writeln!(out, "  {:<10} {}", action.label, action.href());
    }
    out.trim_end().to_string()
}

#[must_use]
pub fn nav(nav: &Navigation) -> String {
    let brand = nav.brand();
    let mut out = format!("{} ({})\n", brand.label, brand.href());
    for link in nav.links() {
        let _ = writeln!(out, "  {:<10} {}", link.label, link.href());
    }
    out.trim_end().to_string()
}

#[must_use]
pub fn dashboard(state: &PageState<DashboardView>) -> String {
    let mut out = format!("{}\n{}\n\n", dashboard::TITLE, dashboard::SUBTITLE);
    match state {
        PageState::Idle | PageState::Loading => out.push_str(LOADING),
        PageState::Error(message) => out.push_str(message),
        PageState::Success(DashboardView::Empty) => out.push_str(dashboard::NO_DATA_MESSAGE),
        PageState::Success(DashboardView::Snapshot(snapshot)) => {
            let _ = writeln!(out, "Company ID: {}", snapshot.company_id);
            let _ = writeln!(out, "Record ID:  {}", snapshot.record_id);
            let _ = writeln!(out, "Created:    {}", snapshot.created_at);
            let _ = write!(out, "\n{}", snapshot.payload);
        }
    }
    out
}

/// Show a secret by its last four characters only.
fn mask(value: &str) -> String {
    if value.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

#[must_use]
pub fn settings(state: &PageState<Company>, form: &SettingsForm) -> String {
    let mut out = String::from("Shopify Settings\n\n");
    match state {
        PageState::Idle | PageState::Loading => out.push_str(LOADING),
        PageState::Error(message) => out.push_str(message),
        PageState::Success(company) => {
            let _ = writeln!(out, "Company:      {} (#{})", company.name, company.id);
            let domain = if form.store_domain.is_empty() {
                "(not set)"
            } else {
                form.store_domain.as_str()
            };
            let _ = writeln!(out, "Store domain: {domain}");
            let _ = writeln!(out, "API key:      {}", mask(&form.api_key));
            let _ = write!(out, "Access token: {}", mask(&form.access_token));
        }
    }
    out
}

#[must_use]
pub fn save_outcome(state: &PageState<String>) -> String {
    match state {
        PageState::Idle => String::new(),
        PageState::Loading => "Saving...".to_string(),
        PageState::Success(message) | PageState::Error(message) => message.clone(),
    }
}

#[must_use]
pub fn companies(companies: &[Company]) -> String {
    if companies.is_empty() {
        return "No companies.".to_string();
    }

    let mut out = format!("{:<6} {:<30} {:<30} {}\n", "ID", "NAME", "SHOPIFY DOMAIN", "CREATED");
    for company in companies {
        let _ = writeln!(
            out,
            "{:<6} {:<30} {:<30} {}",
            company.id.to_string(),
            company.name,
            company.shopify_domain.as_deref().unwrap_or("-"),
            company.created_at.format("%Y-%m-%d"),
        );
    }
    out.trim_end().to_string()
}

#[must_use]
pub fn signup(result: &SignupResult) -> String {
    format!(
        "{} complete. Signed in as {} for {} (company #{}).",
        signup::TITLE,
        result.user.email,
        result.company.name,
        result.company.id
    )
}

#[must_use]
pub fn login(result: &LoginResult) -> String {
    match &result.company {
        Some(company) => format!(
            "Signed in as {} for {} (company #{}).",
            result.user.email, company.name, company.id
        ),
        None => format!(
            "Signed in as {} (company #{}).",
            result.user.email, result.user.company_id
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use saas_dashboard_client::pages::{SnapshotView, settings as settings_page};
    use saas_dashboard_core::{CompanyId, DashboardDataId, IntegrationSecret};

    use super::*;

    fn company() -> Company {
        Company {
            id: CompanyId::new(3),
            name: "Acme".to_string(),
            shopify_domain: Some("acme.myshopify.com".to_string()),
            api_key: Some(IntegrationSecret::new("key-123456")),
            access_token: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_home_lists_actions() {
        let text = home(&HomePage);
        assert!(text.starts_with("B2B SaaS Dashboard"));
        assert!(text.contains("/login"));
        assert!(text.contains("/signup"));
    }

    #[test]
    fn test_nav_lists_every_link() {
        let text = nav(&Navigation);
        for path in ["/", "/login", "/signup", "/dashboard", "/settings"] {
            assert!(text.contains(path), "missing {path}");
        }
    }

    #[test]
    fn test_dashboard_states() {
        assert!(dashboard(&PageState::Loading).ends_with(LOADING));
        assert!(
            dashboard(&PageState::Success(DashboardView::Empty))
                .ends_with(dashboard::NO_DATA_MESSAGE)
        );
        assert!(dashboard(&PageState::Error("boom".to_string())).ends_with("boom"));

        let view = DashboardView::Snapshot(SnapshotView {
            company_id: CompanyId::new(3),
            record_id: DashboardDataId::new(8),
            created_at: "2024-05-01 12:00:00".to_string(),
            payload: serde_json::to_string_pretty(&serde_json::json!({"orders": 4})).unwrap(),
        });
        let text = dashboard(&PageState::Success(view));
        assert!(text.contains("Record ID:  8"));
        assert!(text.contains("\"orders\": 4"));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("key-123456"), "******3456");
    }

    #[test]
    fn test_settings_masks_secrets() {
        let company = company();
        let form = SettingsForm::from_company(&company);
        let text = settings(&PageState::Success(company), &form);

        assert!(text.contains("acme.myshopify.com"));
        assert!(!text.contains("key-123456"));
        assert!(text.contains("3456"));
        assert!(text.contains("Access token: (not set)"));
    }

    #[test]
    fn test_companies_table() {
        assert_eq!(companies(&[]), "No companies.");

        let text = companies(&[company()]);
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("ID"));
        let row = lines.next().unwrap();
        assert!(row.contains("Acme"));
        assert!(row.contains("2024-05-01"));
    }

    #[test]
    fn test_save_outcome() {
        assert_eq!(save_outcome(&PageState::Idle), "");
        assert_eq!(
            save_outcome(&PageState::Success(settings_page::SAVED_MESSAGE.to_string())),
            settings_page::SAVED_MESSAGE
        );
    }
}
