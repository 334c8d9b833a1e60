//! # Settings Commands
//!
//! Language and store location. Both choices are persisted in the
//! settings table and restored on the next start.

use serde::Serialize;
use tracing::{debug, info};

use optipos_core::location::StoreLocation;
use optipos_core::locale::Direction;
use optipos_core::validation::{validate_name, validate_phone};
use optipos_core::{Change, Command, Locale};

use crate::error::{ApiError, ApiResult};
use crate::state::{SessionState, StoreState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleInfo {
    pub locale: Locale,
    /// Layout flips right-to-left for Arabic.
    pub rtl: bool,
}

impl From<Locale> for LocaleInfo {
    fn from(locale: Locale) -> Self {
        LocaleInfo {
            locale,
            rtl: locale.direction() == Direction::Rtl,
        }
    }
}

// =============================================================================
// Language
// =============================================================================

pub fn get_locale(session: &SessionState) -> LocaleInfo {
    session.locale().into()
}

/// Accepts `en`/`ar` as well as the language names.
pub async fn set_locale(
    store: &StoreState,
    session: &SessionState,
    code: &str,
) -> ApiResult<LocaleInfo> {
    let locale: Locale = code.parse()?;
    store.db().settings().set_language(locale).await?;
    session.set_locale(locale);
    info!(%locale, "Language changed");
    Ok(locale.into())
}

/// Text for a translation key in the active language; unknown keys come
/// back unchanged.
pub fn translate(session: &SessionState, key: &str) -> String {
    session.translator().t(key).to_string()
}

// =============================================================================
// Store Locations
// =============================================================================

pub fn list_locations(store: &StoreState) -> Vec<StoreLocation> {
    store.snapshot().locations.all().to_vec()
}

pub async fn upsert_location(
    store: &StoreState,
    location: StoreLocation,
) -> ApiResult<StoreLocation> {
    debug!(id = %location.id, "upsert_location command");
    if location.id.trim().is_empty() {
        return Err(ApiError::validation("id"));
    }
    validate_name(location.name.get(Locale::En))?;
    if !location.phone.trim().is_empty() {
        validate_phone(&location.phone)?;
    }

    match store.execute(Command::UpsertLocation(location)).await? {
        Change::Location(location) => Ok(location),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

pub async fn select_location(
    store: &StoreState,
    session: &SessionState,
    location_id: &str,
) -> ApiResult<StoreLocation> {
    let location = store
        .snapshot()
        .locations
        .get(location_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Location", location_id))?;

    store.db().settings().set_selected_location(&location.id).await?;
    session.select_location(location.id.clone());
    info!(location = %location.id, "Store location selected");
    Ok(location)
}

/// The selected location, falling back to the default one.
pub fn selected_location(store: &StoreState, session: &SessionState) -> Option<StoreLocation> {
    let snapshot = store.snapshot();
    session.location(&snapshot.locations).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{location, store};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_language_persists() {
        let store = store().await;
        let session = SessionState::default();

        let info = set_locale(&store, &session, "arabic").await.unwrap();
        assert!(info.rtl);
        assert_eq!(translate(&session, "status.pending"), "قيد الانتظار");

        let restored = SessionState::restore(store.db()).await.unwrap();
        assert_eq!(get_locale(&restored).locale, Locale::Ar);
    }

    #[tokio::test]
    async fn test_unknown_language_rejected() {
        let store = store().await;
        let err = set_locale(&store, &SessionState::default(), "fr")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("language"));
    }

    #[tokio::test]
    async fn test_selection_falls_back_to_default() {
        let store = store().await;
        let session = SessionState::default();
        upsert_location(&store, location("hawalli", true)).await.unwrap();
        upsert_location(&store, location("salmiya", false)).await.unwrap();

        assert_eq!(selected_location(&store, &session).unwrap().id, "hawalli");

        select_location(&store, &session, "salmiya").await.unwrap();
        assert_eq!(selected_location(&store, &session).unwrap().id, "salmiya");

        let restored = SessionState::restore(store.db()).await.unwrap();
        assert_eq!(restored.selected_location_id().as_deref(), Some("salmiya"));

        let err = select_location(&store, &session, "jahra").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_new_default_clears_old_one() {
        let store = store().await;
        upsert_location(&store, location("hawalli", true)).await.unwrap();
        upsert_location(&store, location("salmiya", true)).await.unwrap();

        let defaults: Vec<_> = list_locations(&store)
            .into_iter()
            .filter(|l| l.is_default)
            .map(|l| l.id)
            .collect();
        assert_eq!(defaults, vec!["salmiya".to_string()]);
    }
}
