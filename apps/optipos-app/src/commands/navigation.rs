//! # Navigation Commands
//!
//! Section changes go through the session navigator so that Back returns
//! to the previous screen with its parameters.

use optipos_core::navigation::{NavigationCommand, Route, Section};

use crate::state::SessionState;

/// Opens a section. Detail sections without an id land on the dashboard.
pub fn navigate(session: &SessionState, section: Section, param: Option<&str>) -> Route {
    session.navigate(NavigationCommand::Navigate(Route::resolve(section, param)))
}

pub fn go_back(session: &SessionState) -> Route {
    session.navigate(NavigationCommand::Back)
}

pub fn current_route(session: &SessionState) -> Route {
    session.route()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_restores_parameters() {
        let session = SessionState::default();
        navigate(&session, Section::Patients, None);
        navigate(&session, Section::PatientProfile, Some("p-1"));
        navigate(&session, Section::InvoiceDetails, Some("inv-9"));

        assert_eq!(
            go_back(&session),
            Route::PatientProfile {
                patient_id: "p-1".into()
            }
        );
        assert_eq!(go_back(&session), Route::Patients);
        assert_eq!(go_back(&session), Route::Dashboard);
        assert_eq!(go_back(&session), Route::Dashboard);
    }

    #[test]
    fn test_missing_param_redirects_to_dashboard() {
        let session = SessionState::default();
        navigate(&session, Section::Inventory, None);
        assert_eq!(navigate(&session, Section::WorkOrderDetails, Some("  ")), Route::Dashboard);
        assert_eq!(current_route(&session).section(), Section::Dashboard);
    }
}
