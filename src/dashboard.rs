//! Dashboard (Settings) Page
//!
//! Static composition: a heading plus the account-deletion control, which
//! is defined and implemented elsewhere. The page itself holds no state.

use serde::Serialize;
use std::sync::Arc;

pub const DASHBOARD_TITLE: &str = "Settings";
pub const DASHBOARD_DESCRIPTION: &str = "Manage account and website settings.";

/// A settings control hosted by the dashboard
pub trait AccountWidget: Send + Sync {
    /// Stable identifier the front end mounts the control by
    fn kind(&self) -> &str;

    fn title(&self) -> &str;

    fn description(&self) -> &str;
}

/// Descriptor of the account-deletion control
#[derive(Debug, Default)]
pub struct DeleteAccount;

impl AccountWidget for DeleteAccount {
    fn kind(&self) -> &str {
        "delete_account"
    }

    fn title(&self) -> &str {
        "Delete account"
    }

    fn description(&self) -> &str {
        "Permanently remove your account."
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetView {
    pub kind: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub description: String,
    pub widgets: Vec<WidgetView>,
}

pub struct DashboardPage {
    account_widget: Arc<dyn AccountWidget>,
}

impl DashboardPage {
    pub fn new(account_widget: Arc<dyn AccountWidget>) -> Self {
        Self { account_widget }
    }

    pub fn view(&self) -> DashboardView {
        let widget = self.account_widget.as_ref();
        DashboardView {
            title: DASHBOARD_TITLE.to_string(),
            description: DASHBOARD_DESCRIPTION.to_string(),
            widgets: vec![WidgetView {
                kind: widget.kind().to_string(),
                title: widget.title().to_string(),
                description: widget.description().to_string(),
            }],
        }
    }
}

impl Default for DashboardPage {
    fn default() -> Self {
        Self::new(Arc::new(DeleteAccount))
    }
}
