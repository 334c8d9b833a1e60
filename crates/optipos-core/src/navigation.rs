//! # Navigation
//!
//! The dashboard shell switches between a closed set of sections. Screens
//! ask to move by returning a [`NavigationCommand`]; the shell applies it
//! to its [`Navigator`].
//!
//! ```text
//! refund screen ──► NavigationCommand::Navigate(Route::CreateInvoice { exchange_for })
//!                               │
//!                               ▼
//!                    Navigator { current, history }
//! ```
//!
//! A route that needs an id but arrives without one resolves to the
//! dashboard instead of a broken screen.

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Dashboard,
    Patients,
    PatientProfile,
    CreateInvoice,
    Invoices,
    InvoiceDetails,
    WorkOrders,
    WorkOrderDetails,
    RefundExchange,
    Inventory,
    Reports,
    Settings,
}

/// A section together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "section", rename_all = "kebab-case")]
pub enum Route {
    Dashboard,
    Patients,
    #[serde(rename_all = "camelCase")]
    PatientProfile { patient_id: String },
    #[serde(rename_all = "camelCase")]
    CreateInvoice {
        patient_id: Option<String>,
        /// Original invoice when this sale replaces an exchanged one.
        exchange_for: Option<String>,
    },
    Invoices,
    #[serde(rename_all = "camelCase")]
    InvoiceDetails { invoice_id: String },
    WorkOrders,
    #[serde(rename_all = "camelCase")]
    WorkOrderDetails { work_order_id: String },
    #[serde(rename_all = "camelCase")]
    RefundExchange { invoice_id: Option<String> },
    Inventory,
    Reports,
    Settings,
}

impl Route {
    pub fn section(&self) -> Section {
        match self {
            Route::Dashboard => Section::Dashboard,
            Route::Patients => Section::Patients,
            Route::PatientProfile { .. } => Section::PatientProfile,
            Route::CreateInvoice { .. } => Section::CreateInvoice,
            Route::Invoices => Section::Invoices,
            Route::InvoiceDetails { .. } => Section::InvoiceDetails,
            Route::WorkOrders => Section::WorkOrders,
            Route::WorkOrderDetails { .. } => Section::WorkOrderDetails,
            Route::RefundExchange { .. } => Section::RefundExchange,
            Route::Inventory => Section::Inventory,
            Route::Reports => Section::Reports,
            Route::Settings => Section::Settings,
        }
    }

    /// Builds a route from a section and its raw parameter.
    ///
    /// Sections that require an id fall back to [`Route::Dashboard`] when
    /// the parameter is missing or blank.
    pub fn resolve(section: Section, param: Option<&str>) -> Route {
        let param = param.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);

        let required = |build: fn(String) -> Route| match param.clone() {
            Some(id) => build(id),
            None => {
                warn!(?section, "Route is missing its parameter, redirecting to dashboard");
                Route::Dashboard
            }
        };

        match section {
            Section::Dashboard => Route::Dashboard,
            Section::Patients => Route::Patients,
            Section::PatientProfile => required(|patient_id| Route::PatientProfile { patient_id }),
            Section::CreateInvoice => Route::CreateInvoice {
                patient_id: param.clone(),
                exchange_for: None,
            },
            Section::Invoices => Route::Invoices,
            Section::InvoiceDetails => required(|invoice_id| Route::InvoiceDetails { invoice_id }),
            Section::WorkOrders => Route::WorkOrders,
            Section::WorkOrderDetails => {
                required(|work_order_id| Route::WorkOrderDetails { work_order_id })
            }
            Section::RefundExchange => Route::RefundExchange {
                invoice_id: param.clone(),
            },
            Section::Inventory => Route::Inventory,
            Section::Reports => Route::Reports,
            Section::Settings => Route::Settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "route", rename_all = "snake_case")]
pub enum NavigationCommand {
    Navigate(Route),
    /// Navigate without leaving a history entry.
    Replace(Route),
    Back,
}

// =============================================================================
// Navigator
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    current: Route,
    history: Vec<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator {
            current: Route::Dashboard,
            history: Vec::new(),
        }
    }
}

impl Navigator {
    pub fn current(&self) -> &Route {
        &self.current
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Applies a command and returns the route now shown.
    pub fn apply(&mut self, command: NavigationCommand) -> &Route {
        match command {
            NavigationCommand::Navigate(route) => {
                if route != self.current {
                    let previous = std::mem::replace(&mut self.current, route);
                    self.history.push(previous);
                }
            }
            NavigationCommand::Replace(route) => self.current = route,
            NavigationCommand::Back => {
                if let Some(previous) = self.history.pop() {
                    self.current = previous;
                }
            }
        }
        &self.current
    }
}
