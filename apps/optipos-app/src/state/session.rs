//! # Session State
//!
//! Per-session UI state: active language, navigation history, and the
//! selected store location. Language and location survive a restart
//! through the settings table; navigation starts fresh on the dashboard.

use std::sync::{Mutex, PoisonError, RwLock};

use tracing::{debug, info};

use optipos_core::location::{LocationRegistry, StoreLocation};
use optipos_core::navigation::{NavigationCommand, Navigator, Route};
use optipos_core::{Locale, Translator};
use optipos_db::{Database, DbResult};

#[derive(Debug, Default)]
pub struct SessionState {
    translator: RwLock<Translator>,
    navigator: Mutex<Navigator>,
    selected_location: RwLock<Option<String>>,
}

impl SessionState {
    /// Restores the stored language and location selection.
    pub async fn restore(db: &Database) -> DbResult<Self> {
        let settings = db.settings();
        let locale = settings.language().await?.unwrap_or_default();
        let selected = settings.selected_location().await?;
        info!(locale = %locale, selected = ?selected, "Session restored");

        Ok(SessionState {
            translator: RwLock::new(Translator::new(locale)),
            navigator: Mutex::new(Navigator::default()),
            selected_location: RwLock::new(selected),
        })
    }

    pub fn translator(&self) -> Translator {
        *self.translator.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn locale(&self) -> Locale {
        self.translator().locale()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.translator
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_locale(locale);
    }

    pub fn route(&self) -> Route {
        self.navigator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
            .clone()
    }

    pub fn navigate(&self, command: NavigationCommand) -> Route {
        let mut navigator = self.navigator.lock().unwrap_or_else(PoisonError::into_inner);
        let route = navigator.apply(command).clone();
        debug!(section = ?route.section(), "Navigated");
        route
    }

    pub fn selected_location_id(&self) -> Option<String> {
        self.selected_location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn select_location(&self, id: impl Into<String>) {
        *self
            .selected_location
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(id.into());
    }

    /// The selected location, or the default when the stored one is gone.
    pub fn location<'a>(&self, registry: &'a LocationRegistry) -> Option<&'a StoreLocation> {
        registry.resolve_selected(self.selected_location_id().as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optipos_db::DbConfig;

    #[tokio::test]
    async fn test_restore_reads_stored_language() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set_language(Locale::Ar).await.unwrap();
        db.settings().set_selected_location("salmiya").await.unwrap();

        let session = SessionState::restore(&db).await.unwrap();
        assert_eq!(session.locale(), Locale::Ar);
        assert_eq!(session.selected_location_id().as_deref(), Some("salmiya"));
        assert_eq!(session.route(), Route::Dashboard);
    }

    #[test]
    fn test_navigation_history() {
        let session = SessionState::default();
        session.navigate(NavigationCommand::Navigate(Route::Patients));
        session.navigate(NavigationCommand::Navigate(Route::Inventory));
        assert_eq!(session.navigate(NavigationCommand::Back), Route::Patients);
    }
}
