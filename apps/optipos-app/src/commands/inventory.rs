//! # Inventory Commands
//!
//! Catalog items of every kind plus the lens pricing table.
//!
//! Deleting a lens type, coating or thickness also drops the pricing rows
//! that name it.

use tracing::{debug, info};

use optipos_core::validation::{validate_name, validate_price};
use optipos_core::{
    CatalogItem, CatalogKind, Change, Command, LensPricingCombination, Money, ValidationError,
};

use crate::error::{ApiError, ApiResult};
use crate::state::StoreState;

fn expect_pricing(change: Change) -> ApiResult<LensPricingCombination> {
    match change {
        Change::Pricing(combination) => Ok(combination),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

fn validate_item(item: &CatalogItem) -> Result<(), ValidationError> {
    if item.id().trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    // Lens components may leave the price empty; it then counts as zero.
    let price = match item {
        CatalogItem::Frame(frame) => {
            validate_name(&frame.brand)?;
            Some(frame.price)
        }
        CatalogItem::ContactLens(lens) => {
            validate_name(&lens.brand)?;
            Some(lens.price)
        }
        CatalogItem::RepairService(service) => Some(service.price),
        CatalogItem::LensType(lens_type) => lens_type.price,
        CatalogItem::LensCoating(coating) => coating.price,
        CatalogItem::LensThickness(thickness) => thickness.price,
    };

    match price {
        Some(price) => validate_price(price),
        None => Ok(()),
    }
}

// =============================================================================
// Catalog Items
// =============================================================================

pub async fn upsert_catalog_item(store: &StoreState, item: CatalogItem) -> ApiResult<CatalogItem> {
    debug!(kind = %item.kind(), id = %item.id(), "upsert_catalog_item command");
    validate_item(&item)?;

    match store.execute(Command::UpsertCatalogItem(item)).await? {
        Change::CatalogItem(item) => Ok(item),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

/// Returns the ids of pricing rows removed with the item.
pub async fn delete_catalog_item(
    store: &StoreState,
    kind: CatalogKind,
    id: String,
) -> ApiResult<Vec<String>> {
    debug!(%kind, id = %id, "delete_catalog_item command");
    match store.execute(Command::DeleteCatalogItem { kind, id }).await? {
        Change::CatalogItemDeleted {
            kind,
            id,
            pricing_removed,
        } => {
            info!(%kind, id = %id, pricing_removed = pricing_removed.len(), "Catalog item deleted");
            Ok(pricing_removed)
        }
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

pub fn list_catalog(store: &StoreState, kind: CatalogKind) -> Vec<CatalogItem> {
    store.snapshot().catalog.items(kind)
}

// =============================================================================
// Lens Pricing
// =============================================================================

/// Adds a price for a new combination; an existing combination is a
/// duplicate error.
pub async fn add_pricing(
    store: &StoreState,
    lens_type_id: String,
    coating_id: String,
    thickness_id: String,
    price: Money,
) -> ApiResult<LensPricingCombination> {
    debug!(
        lens_type_id = %lens_type_id,
        coating_id = %coating_id,
        thickness_id = %thickness_id,
        "add_pricing command"
    );
    validate_price(price)?;
    ensure_components(store, &lens_type_id, &coating_id, &thickness_id)?;

    let combination = LensPricingCombination::new(lens_type_id, coating_id, thickness_id, price);
    expect_pricing(store.execute(Command::InsertPricing(combination)).await?)
}

/// Sets the price for a combination, replacing any stored one.
pub async fn set_pricing(
    store: &StoreState,
    lens_type_id: String,
    coating_id: String,
    thickness_id: String,
    price: Money,
) -> ApiResult<LensPricingCombination> {
    debug!(
        lens_type_id = %lens_type_id,
        coating_id = %coating_id,
        thickness_id = %thickness_id,
        "set_pricing command"
    );
    validate_price(price)?;
    ensure_components(store, &lens_type_id, &coating_id, &thickness_id)?;

    let combination = LensPricingCombination::new(lens_type_id, coating_id, thickness_id, price);
    expect_pricing(store.execute(Command::UpsertPricing(combination)).await?)
}

pub async fn delete_pricing(store: &StoreState, id: String) -> ApiResult<()> {
    debug!(id = %id, "delete_pricing command");
    match store.execute(Command::DeletePricing { id }).await? {
        Change::PricingDeleted { .. } => Ok(()),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

pub fn list_pricing(store: &StoreState) -> Vec<LensPricingCombination> {
    store.snapshot().catalog.pricing.iter().cloned().collect()
}

fn ensure_components(
    store: &StoreState,
    lens_type_id: &str,
    coating_id: &str,
    thickness_id: &str,
) -> ApiResult<()> {
    let snapshot = store.snapshot();
    let catalog = &snapshot.catalog;
    if catalog.lens_type(lens_type_id).is_none() {
        return Err(ApiError::not_found("Lens type", lens_type_id));
    }
    if catalog.lens_coating(coating_id).is_none() {
        return Err(ApiError::not_found("Lens coating", coating_id));
    }
    if catalog.lens_thickness(thickness_id).is_none() {
        return Err(ApiError::not_found("Lens thickness", thickness_id));
    }
    Ok(())
}
