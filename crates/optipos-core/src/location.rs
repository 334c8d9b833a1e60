//! Store locations.
//!
//! One location is the default. The cashier's selection is persisted under
//! the `selectedLocation` settings key; a stored id that no longer exists
//! resolves to the default.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::locale::LocalizedText;

/// Settings key holding the selected location id.
pub const SELECTED_LOCATION_KEY: &str = "selectedLocation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StoreLocation {
    pub id: String,
    pub name: LocalizedText,
    pub address: LocalizedText,
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationRegistry {
    locations: Vec<StoreLocation>,
}

impl LocationRegistry {
    /// Builds a registry, keeping at most one default (the first flagged,
    /// or the first location when none is).
    pub fn new(mut locations: Vec<StoreLocation>) -> Self {
        let default_index = locations.iter().position(|l| l.is_default).unwrap_or(0);
        for (index, location) in locations.iter_mut().enumerate() {
            location.is_default = index == default_index;
        }
        LocationRegistry { locations }
    }

    pub fn all(&self) -> &[StoreLocation] {
        &self.locations
    }

    pub fn get(&self, id: &str) -> Option<&StoreLocation> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn default_location(&self) -> Option<&StoreLocation> {
        self.locations.iter().find(|l| l.is_default)
    }

    /// The stored selection if it still exists, otherwise the default.
    pub fn resolve_selected(&self, stored_id: Option<&str>) -> Option<&StoreLocation> {
        stored_id
            .and_then(|id| self.get(id))
            .or_else(|| self.default_location())
    }

    /// Inserts or replaces a location; flagging it default clears the flag
    /// elsewhere.
    pub fn upsert(&mut self, location: StoreLocation) {
        let make_default = location.is_default || self.locations.is_empty();
        let id = location.id.clone();
        match self.locations.iter_mut().find(|l| l.id == id) {
            Some(existing) => *existing = location,
            None => self.locations.push(location),
        }
        if make_default {
            for l in &mut self.locations {
                l.is_default = l.id == id;
            }
        } else if self.default_location().is_none() {
            if let Some(first) = self.locations.first_mut() {
                first.is_default = true;
            }
        }
    }
}
