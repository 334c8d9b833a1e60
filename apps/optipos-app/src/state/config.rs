//! # Configuration State
//!
//! Shop-level settings read once at startup.
//!
//! ## Sources (priority order)
//! 1. Environment variables (`OPTIPOS_*`)
//! 2. Defaults (this file)
//!
//! Sync settings live in `optipos_sync::SyncConfig`; store locations are
//! domain data and live in the snapshot.

use serde::{Deserialize, Serialize};
use tracing::warn;

use optipos_core::receipt::RECEIPT_WIDTH;
use optipos_core::LocalizedText;

pub const STORE_NAME_ENV: &str = "OPTIPOS_STORE_NAME";
pub const RECEIPT_WIDTH_ENV: &str = "OPTIPOS_RECEIPT_WIDTH";

/// Narrowest printout that still fits a label and an amount.
const MIN_RECEIPT_WIDTH: usize = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Printed on receipts when no store location is selected.
    pub store_name: LocalizedText,

    /// Characters per printed line (48 for 80mm thermal paper).
    pub receipt_width: usize,
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState {
            store_name: LocalizedText::bilingual("Optical Store", "محل النظارات"),
            receipt_width: RECEIPT_WIDTH,
        }
    }
}

impl ConfigState {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `OPTIPOS_STORE_NAME` takes the packed `"English | Arabic"` form.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(name) = lookup(STORE_NAME_ENV).filter(|n| !n.trim().is_empty()) {
            config.store_name = LocalizedText::from_legacy(&name);
        }

        if let Some(raw) = lookup(RECEIPT_WIDTH_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(width) if width >= MIN_RECEIPT_WIDTH => config.receipt_width = width,
                _ => warn!(value = %raw, "Ignoring invalid receipt width"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optipos_core::Locale;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConfigState::from_lookup(lookup(&[]));
        assert_eq!(config.receipt_width, 48);
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigState::from_lookup(lookup(&[
            (STORE_NAME_ENV, "Vision Optics | رؤية للبصريات"),
            (RECEIPT_WIDTH_ENV, "42"),
        ]));
        assert_eq!(config.store_name.get(Locale::Ar), "رؤية للبصريات");
        assert_eq!(config.receipt_width, 42);
    }

    #[test]
    fn test_too_narrow_width_ignored() {
        let config = ConfigState::from_lookup(lookup(&[(RECEIPT_WIDTH_ENV, "10")]));
        assert_eq!(config.receipt_width, 48);
    }
}
