//! # Catalog
//!
//! Sellable inventory of an optical store: frames, the three lens
//! components (type, coating, thickness), contact lenses, and repair
//! services.
//!
//! ```text
//! ┌───────────────┐  ┌──────────────┐  ┌───────────────┐  ┌──────────────┐
//! │    Frame      │  │  LensType    │  │  LensCoating  │  │ LensThickness│
//! │ brand, model  │  │ single/prog. │  │ AR, blue cut, │  │ 1.50 … 1.74  │
//! │ color, size   │  │ price        │  │ photochromic  │  │ price        │
//! └───────────────┘  └──────┬───────┘  └──────┬────────┘  └──────┬───────┘
//!                           └────────────┬────┴──────────────────┘
//!                                        ▼
//!                           LensPricingCombination (pricing.rs)
//! ```
//!
//! Deletes are hard deletes: the item disappears from the catalog. Invoices
//! keep their own snapshot of names and prices, so history survives.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::locale::{LocalizedText, LEGACY_SEPARATOR};
use crate::money::Money;
use crate::pricing::PricingTable;

// =============================================================================
// Catalog Kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Frame,
    LensType,
    LensCoating,
    LensThickness,
    ContactLens,
    RepairService,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 6] = [
        CatalogKind::Frame,
        CatalogKind::LensType,
        CatalogKind::LensCoating,
        CatalogKind::LensThickness,
        CatalogKind::ContactLens,
        CatalogKind::RepairService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Frame => "frame",
            CatalogKind::LensType => "lens_type",
            CatalogKind::LensCoating => "lens_coating",
            CatalogKind::LensThickness => "lens_thickness",
            CatalogKind::ContactLens => "contact_lens",
            CatalogKind::RepairService => "repair_service",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Items
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub color: LocalizedText,
    /// Eye size / bridge / temple as printed on the arm, e.g. `52-18-140`.
    pub size: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

impl Frame {
    /// Case-insensitive identity used to spot the same frame imported twice.
    ///
    /// The color goes through its packed backend form so a local frame and
    /// the row it was pushed as always produce the same key.
    pub fn dedup_key(&self) -> String {
        frame_dedup_key(&self.brand, &self.model, &self.color.to_legacy(), &self.size)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

/// Builds the `brand|model|color|size` lookup key, trimmed and lowercased.
///
/// `color` is the packed `"English | Arabic"` value; only its first part
/// takes part in the key.
pub fn frame_dedup_key(brand: &str, model: &str, color: &str, size: &str) -> String {
    let color = color.split(LEGACY_SEPARATOR).next().unwrap_or_default();
    [brand, model, color, size]
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LensType {
    pub id: String,
    pub name: LocalizedText,
    /// Single vision, bifocal, progressive, reading...
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LensCoating {
    pub id: String,
    pub name: LocalizedText,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub is_photochromic: bool,
    /// Tints offered for photochromic coatings.
    #[serde(default)]
    pub colors: Vec<LocalizedText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LensThickness {
    pub id: String,
    pub name: LocalizedText,
    #[serde(default)]
    pub price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContactLens {
    pub id: String,
    pub brand: String,
    /// Daily, monthly, toric...
    pub kind: String,
    #[serde(default)]
    pub power: Option<String>,
    /// Price per box.
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RepairService {
    pub id: String,
    pub name: LocalizedText,
    pub price: Money,
}

/// Any catalog entry, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum CatalogItem {
    Frame(Frame),
    LensType(LensType),
    LensCoating(LensCoating),
    LensThickness(LensThickness),
    ContactLens(ContactLens),
    RepairService(RepairService),
}

impl CatalogItem {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogItem::Frame(_) => CatalogKind::Frame,
            CatalogItem::LensType(_) => CatalogKind::LensType,
            CatalogItem::LensCoating(_) => CatalogKind::LensCoating,
            CatalogItem::LensThickness(_) => CatalogKind::LensThickness,
            CatalogItem::ContactLens(_) => CatalogKind::ContactLens,
            CatalogItem::RepairService(_) => CatalogKind::RepairService,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Frame(i) => &i.id,
            CatalogItem::LensType(i) => &i.id,
            CatalogItem::LensCoating(i) => &i.id,
            CatalogItem::LensThickness(i) => &i.id,
            CatalogItem::ContactLens(i) => &i.id,
            CatalogItem::RepairService(i) => &i.id,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// The whole catalog plus the lens pricing table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub frames: Vec<Frame>,
    pub lens_types: Vec<LensType>,
    pub lens_coatings: Vec<LensCoating>,
    pub lens_thicknesses: Vec<LensThickness>,
    pub contact_lenses: Vec<ContactLens>,
    pub services: Vec<RepairService>,
    pub pricing: PricingTable,
}

macro_rules! upsert_by_id {
    ($list:expr, $item:expr) => {{
        let item = $item;
        match $list.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                false
            }
            None => {
                $list.push(item);
                true
            }
        }
    }};
}

impl Catalog {
    /// Inserts or replaces an item; returns `true` when it was new.
    pub fn upsert(&mut self, item: CatalogItem) -> bool {
        match item {
            CatalogItem::Frame(i) => upsert_by_id!(self.frames, i),
            CatalogItem::LensType(i) => upsert_by_id!(self.lens_types, i),
            CatalogItem::LensCoating(i) => upsert_by_id!(self.lens_coatings, i),
            CatalogItem::LensThickness(i) => upsert_by_id!(self.lens_thicknesses, i),
            CatalogItem::ContactLens(i) => upsert_by_id!(self.contact_lenses, i),
            CatalogItem::RepairService(i) => upsert_by_id!(self.services, i),
        }
    }

    /// Removes an item; returns `false` when nothing matched.
    ///
    /// Removing a lens component also drops the pricing combinations that
    /// reference it.
    pub fn remove(&mut self, kind: CatalogKind, id: &str) -> bool {
        fn retain<T>(list: &mut Vec<T>, id: &str, get: impl Fn(&T) -> &str) -> bool {
            let before = list.len();
            list.retain(|item| get(item) != id);
            list.len() != before
        }

        let removed = match kind {
            CatalogKind::Frame => retain(&mut self.frames, id, |i| &i.id),
            CatalogKind::LensType => retain(&mut self.lens_types, id, |i| &i.id),
            CatalogKind::LensCoating => retain(&mut self.lens_coatings, id, |i| &i.id),
            CatalogKind::LensThickness => retain(&mut self.lens_thicknesses, id, |i| &i.id),
            CatalogKind::ContactLens => retain(&mut self.contact_lenses, id, |i| &i.id),
            CatalogKind::RepairService => retain(&mut self.services, id, |i| &i.id),
        };

        if removed
            && matches!(
                kind,
                CatalogKind::LensType | CatalogKind::LensCoating | CatalogKind::LensThickness
            )
        {
            self.pricing.remove_referencing(kind, id);
        }

        removed
    }

    pub fn frame(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn lens_type(&self, id: &str) -> Option<&LensType> {
        self.lens_types.iter().find(|l| l.id == id)
    }

    pub fn lens_coating(&self, id: &str) -> Option<&LensCoating> {
        self.lens_coatings.iter().find(|c| c.id == id)
    }

    pub fn lens_thickness(&self, id: &str) -> Option<&LensThickness> {
        self.lens_thicknesses.iter().find(|t| t.id == id)
    }

    pub fn contact_lens(&self, id: &str) -> Option<&ContactLens> {
        self.contact_lenses.iter().find(|c| c.id == id)
    }

    pub fn service(&self, id: &str) -> Option<&RepairService> {
        self.services.iter().find(|s| s.id == id)
    }

    /// All items of one kind, wrapped for storage.
    pub fn items(&self, kind: CatalogKind) -> Vec<CatalogItem> {
        match kind {
            CatalogKind::Frame => self.frames.iter().cloned().map(CatalogItem::Frame).collect(),
            CatalogKind::LensType => self
                .lens_types
                .iter()
                .cloned()
                .map(CatalogItem::LensType)
                .collect(),
            CatalogKind::LensCoating => self
                .lens_coatings
                .iter()
                .cloned()
                .map(CatalogItem::LensCoating)
                .collect(),
            CatalogKind::LensThickness => self
                .lens_thicknesses
                .iter()
                .cloned()
                .map(CatalogItem::LensThickness)
                .collect(),
            CatalogKind::ContactLens => self
                .contact_lenses
                .iter()
                .cloned()
                .map(CatalogItem::ContactLens)
                .collect(),
            CatalogKind::RepairService => self
                .services
                .iter()
                .cloned()
                .map(CatalogItem::RepairService)
                .collect(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::pricing::LensPricingCombination;

    fn frame(id: &str, brand: &str) -> Frame {
        Frame {
            id: id.to_string(),
            brand: brand.to_string(),
            model: "RB3025".to_string(),
            color: LocalizedText::from_legacy("Gold | ذهبي"),
            size: "58-14-135".to_string(),
            price: Money::from_major(45),
            stock: 2,
        }
    }

    #[test]
    fn test_dedup_key_is_case_insensitive() {
        let a = frame("1", "Ray-Ban");
        let mut b = frame("2", "  RAY-BAN ");
        b.color = LocalizedText::from_legacy("GOLD");
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key(), "ray-ban|rb3025|gold|58-14-135");
    }

    #[test]
    fn test_dedup_key_for_arabic_only_color_matches_packed_row() {
        let mut f = frame("1", "Ray-Ban");
        f.color = LocalizedText::new("brown").with(Locale::Ar, "بني");

        let packed = f.color.to_legacy();
        assert_eq!(
            f.dedup_key(),
            frame_dedup_key("Ray-Ban", "RB3025", &packed, "58-14-135")
        );
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut catalog = Catalog::default();
        assert!(catalog.upsert(CatalogItem::Frame(frame("1", "Ray-Ban"))));

        let mut updated = frame("1", "Ray-Ban");
        updated.price = Money::from_major(50);
        assert!(!catalog.upsert(CatalogItem::Frame(updated)));

        assert_eq!(catalog.frames.len(), 1);
        assert_eq!(catalog.frame("1").map(|f| f.price), Some(Money::from_major(50)));
    }

    #[test]
    fn test_removing_lens_component_drops_its_prices() {
        let mut catalog = Catalog::default();
        catalog.upsert(CatalogItem::LensType(LensType {
            id: "lt".into(),
            name: LocalizedText::bilingual("Single vision", "أحادية البؤرة"),
            category: None,
            price: Some(Money::from_major(10)),
        }));
        catalog
            .pricing
            .insert(LensPricingCombination::new("lt", "c", "t", Money::from_major(18)))
            .unwrap();

        assert!(catalog.remove(CatalogKind::LensType, "lt"));
        assert!(catalog.pricing.is_empty());
        assert!(!catalog.remove(CatalogKind::LensType, "lt"));
    }

    #[test]
    fn test_catalog_item_serializes_with_kind_tag() {
        let item = CatalogItem::RepairService(RepairService {
            id: "s1".into(),
            name: LocalizedText::bilingual("Screw tightening", "شد البراغي"),
            price: Money::from_minor(500),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "repair_service");
        assert_eq!(json["item"]["price"], 500);
    }
}
