//! # Lens Pricing
//!
//! Resolves the price of a lens from the three selections made on the
//! invoice form.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(lens_type, coating, thickness)                                 │
//! │                                                                         │
//! │  any selection missing? ──► yes ──► None (no total is shown)           │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  stored combination for (type, coating, thickness)?                    │
//! │        ├── yes ──► stored price (authoritative, may differ from sum)    │
//! │        └── no  ──► type.price + coating.price + thickness.price         │
//! │                    (a missing component price counts as 0)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table holds at most one combination per triple. When the backend
//! fetch fails the caller hands in an empty table and resolution falls
//! through to the additive path; it never errors.

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::{CatalogKind, LensCoating, LensThickness, LensType};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Pricing Combination
// =============================================================================

/// A price that overrides the additive default for one lens triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LensPricingCombination {
    pub id: String,
    pub lens_type_id: String,
    pub coating_id: String,
    pub thickness_id: String,
    pub price: Money,
}

impl LensPricingCombination {
    pub fn new(
        lens_type_id: impl Into<String>,
        coating_id: impl Into<String>,
        thickness_id: impl Into<String>,
        price: Money,
    ) -> Self {
        LensPricingCombination {
            id: Uuid::new_v4().to_string(),
            lens_type_id: lens_type_id.into(),
            coating_id: coating_id.into(),
            thickness_id: thickness_id.into(),
            price,
        }
    }

    fn matches(&self, lens_type_id: &str, coating_id: &str, thickness_id: &str) -> bool {
        self.lens_type_id == lens_type_id
            && self.coating_id == coating_id
            && self.thickness_id == thickness_id
    }

    /// Whether this combination uses the given lens component. Only the
    /// column for `kind` is checked; ids are unique per kind, not globally.
    pub fn references(&self, kind: CatalogKind, component_id: &str) -> bool {
        match kind {
            CatalogKind::LensType => self.lens_type_id == component_id,
            CatalogKind::LensCoating => self.coating_id == component_id,
            CatalogKind::LensThickness => self.thickness_id == component_id,
            _ => false,
        }
    }
}

// =============================================================================
// Pricing Table
// =============================================================================

/// The set of stored combinations, unique per triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    combinations: Vec<LensPricingCombination>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from rows fetched from storage or the backend.
    ///
    /// The backend does not enforce uniqueness, so it may hand back two rows
    /// for one triple. The first row wins and the rest are logged and
    /// dropped.
    pub fn from_records(records: impl IntoIterator<Item = LensPricingCombination>) -> Self {
        let mut table = PricingTable::new();
        for record in records {
            let existing =
                table.find(&record.lens_type_id, &record.coating_id, &record.thickness_id);
            if let Some(existing) = existing {
                warn!(
                    kept = %existing.id,
                    dropped = %record.id,
                    lens_type_id = %record.lens_type_id,
                    coating_id = %record.coating_id,
                    thickness_id = %record.thickness_id,
                    "Duplicate lens pricing combination ignored"
                );
                continue;
            }
            table.combinations.push(record);
        }
        table
    }

    /// Adds a new combination, rejecting a second price for the same triple.
    pub fn insert(&mut self, combination: LensPricingCombination) -> CoreResult<()> {
        if self
            .find(
                &combination.lens_type_id,
                &combination.coating_id,
                &combination.thickness_id,
            )
            .is_some()
        {
            return Err(CoreError::DuplicatePricingCombination {
                lens_type_id: combination.lens_type_id,
                coating_id: combination.coating_id,
                thickness_id: combination.thickness_id,
            });
        }
        self.combinations.push(combination);
        Ok(())
    }

    /// Inserts or replaces the price for a triple.
    ///
    /// An existing row keeps its id so remote upserts hit the same record.
    /// Returns the stored combination.
    pub fn upsert(&mut self, combination: LensPricingCombination) -> LensPricingCombination {
        match self.combinations.iter_mut().find(|c| {
            c.matches(
                &combination.lens_type_id,
                &combination.coating_id,
                &combination.thickness_id,
            )
        }) {
            Some(existing) => {
                existing.price = combination.price;
                existing.clone()
            }
            None => {
                self.combinations.push(combination.clone());
                combination
            }
        }
    }

    pub fn find(
        &self,
        lens_type_id: &str,
        coating_id: &str,
        thickness_id: &str,
    ) -> Option<&LensPricingCombination> {
        self.combinations
            .iter()
            .find(|c| c.matches(lens_type_id, coating_id, thickness_id))
    }

    /// Removes a combination by id; returns it when found.
    pub fn remove(&mut self, id: &str) -> Option<LensPricingCombination> {
        let index = self.combinations.iter().position(|c| c.id == id)?;
        Some(self.combinations.remove(index))
    }

    /// Ids of the combinations that use the given lens component.
    pub fn referencing(&self, kind: CatalogKind, component_id: &str) -> Vec<String> {
        self.combinations
            .iter()
            .filter(|c| c.references(kind, component_id))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Drops every combination that uses the given lens component.
    pub fn remove_referencing(&mut self, kind: CatalogKind, component_id: &str) -> usize {
        let before = self.combinations.len();
        self.combinations.retain(|c| !c.references(kind, component_id));
        before - self.combinations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LensPricingCombination> {
        self.combinations.iter()
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// Resolves the lens price for the current selection.
    ///
    /// ## Example
    /// ```rust
    /// use optipos_core::catalog::{LensCoating, LensThickness, LensType};
    /// use optipos_core::locale::LocalizedText;
    /// use optipos_core::money::Money;
    /// use optipos_core::pricing::PricingTable;
    ///
    /// let lens = LensType { id: "lt".into(), name: LocalizedText::new("sv"), category: None, price: Some(Money::from_major(10)) };
    /// let coating = LensCoating { id: "c".into(), name: LocalizedText::new("ar"), price: Some(Money::from_major(8)), is_photochromic: false, colors: vec![] };
    /// let thickness = LensThickness { id: "t".into(), name: LocalizedText::new("1.6"), price: Some(Money::from_major(5)) };
    ///
    /// let table = PricingTable::new();
    /// assert_eq!(table.resolve(Some(&lens), Some(&coating), Some(&thickness)), Some(Money::from_major(23)));
    /// assert_eq!(table.resolve(Some(&lens), None, Some(&thickness)), None);
    /// ```
    pub fn resolve(
        &self,
        lens_type: Option<&LensType>,
        coating: Option<&LensCoating>,
        thickness: Option<&LensThickness>,
    ) -> Option<Money> {
        let (lens_type, coating, thickness) = (lens_type?, coating?, thickness?);

        if let Some(stored) = self.find(&lens_type.id, &coating.id, &thickness.id) {
            return Some(stored.price);
        }

        Some(
            lens_type.price.unwrap_or_default()
                + coating.price.unwrap_or_default()
                + thickness.price.unwrap_or_default(),
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocalizedText;

    fn lens_type(price: Option<i64>) -> LensType {
        LensType {
            id: "lt-1".into(),
            name: LocalizedText::bilingual("Single vision", "أحادية البؤرة"),
            category: Some("single_vision".into()),
            price: price.map(Money::from_major),
        }
    }

    fn coating(price: Option<i64>) -> LensCoating {
        LensCoating {
            id: "co-1".into(),
            name: LocalizedText::bilingual("Blue cut", "حماية من الضوء الأزرق"),
            price: price.map(Money::from_major),
            is_photochromic: false,
            colors: vec![],
        }
    }

    fn thickness(price: Option<i64>) -> LensThickness {
        LensThickness {
            id: "th-1".into(),
            name: LocalizedText::new("1.60"),
            price: price.map(Money::from_major),
        }
    }

    #[test]
    fn test_additive_fallback_then_stored_override() {
        let (lt, co, th) = (lens_type(Some(10)), coating(Some(8)), thickness(Some(5)));
        let mut table = PricingTable::new();

        assert_eq!(
            table.resolve(Some(&lt), Some(&co), Some(&th)),
            Some(Money::from_major(23))
        );

        table
            .insert(LensPricingCombination::new("lt-1", "co-1", "th-1", Money::from_major(18)))
            .unwrap();

        assert_eq!(
            table.resolve(Some(&lt), Some(&co), Some(&th)),
            Some(Money::from_major(18))
        );
    }

    #[test]
    fn test_stored_price_wins_even_when_higher() {
        let (lt, co, th) = (lens_type(Some(10)), coating(Some(8)), thickness(Some(5)));
        let table = PricingTable::from_records(vec![LensPricingCombination::new(
            "lt-1",
            "co-1",
            "th-1",
            Money::from_major(40),
        )]);

        assert_eq!(
            table.resolve(Some(&lt), Some(&co), Some(&th)),
            Some(Money::from_major(40))
        );
    }

    #[test]
    fn test_missing_component_price_counts_as_zero() {
        let (lt, co, th) = (lens_type(Some(10)), coating(None), thickness(Some(5)));
        let table = PricingTable::new();

        assert_eq!(
            table.resolve(Some(&lt), Some(&co), Some(&th)),
            Some(Money::from_major(15))
        );
    }

    #[test]
    fn test_missing_selection_returns_none() {
        let (lt, co, th) = (lens_type(Some(10)), coating(Some(8)), thickness(Some(5)));
        let table = PricingTable::new();

        assert_eq!(table.resolve(None, Some(&co), Some(&th)), None);
        assert_eq!(table.resolve(Some(&lt), None, Some(&th)), None);
        assert_eq!(table.resolve(Some(&lt), Some(&co), None), None);
    }

    #[test]
    fn test_insert_rejects_duplicate_triple() {
        let mut table = PricingTable::new();
        table
            .insert(LensPricingCombination::new("a", "b", "c", Money::from_major(18)))
            .unwrap();

        let err = table
            .insert(LensPricingCombination::new("a", "b", "c", Money::from_major(20)))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicatePricingCombination { .. }));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_price_and_keeps_id() {
        let mut table = PricingTable::new();
        let price = |major| LensPricingCombination::new("a", "b", "c", Money::from_major(major));
        let first = table.upsert(price(18));
        let second = table.upsert(price(21));

        assert_eq!(first.id, second.id);
        assert_eq!(table.len(), 1);
        assert_eq!(table.find("a", "b", "c").map(|c| c.price), Some(Money::from_major(21)));
    }

    #[test]
    fn test_from_records_keeps_first_duplicate() {
        let table = PricingTable::from_records(vec![
            LensPricingCombination::new("a", "b", "c", Money::from_major(18)),
            LensPricingCombination::new("a", "b", "c", Money::from_major(99)),
            LensPricingCombination::new("a", "b", "d", Money::from_major(20)),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.find("a", "b", "c").map(|c| c.price), Some(Money::from_major(18)));
    }

    #[test]
    fn test_remove_referencing() {
        let mut table = PricingTable::from_records(vec![
            LensPricingCombination::new("a", "b", "c", Money::from_major(18)),
            LensPricingCombination::new("x", "b", "y", Money::from_major(20)),
            LensPricingCombination::new("x", "z", "y", Money::from_major(22)),
        ]);

        assert_eq!(table.remove_referencing(CatalogKind::LensCoating, "b"), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_referencing_checks_only_the_deleted_kind() {
        let mut table = PricingTable::from_records(vec![
            LensPricingCombination::new("x", "c1", "t1", Money::from_major(18)),
            LensPricingCombination::new("lt", "x", "t1", Money::from_major(20)),
            LensPricingCombination::new("lt", "c1", "x", Money::from_major(22)),
        ]);

        assert_eq!(table.referencing(CatalogKind::LensType, "x").len(), 1);
        assert_eq!(table.remove_referencing(CatalogKind::LensType, "x"), 1);
        assert_eq!(table.len(), 2);
        assert!(table.find("lt", "x", "t1").is_some());
        assert!(table.find("lt", "c1", "x").is_some());
        assert_eq!(table.remove_referencing(CatalogKind::Frame, "lt"), 0);
    }
}
