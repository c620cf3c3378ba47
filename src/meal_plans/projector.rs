use std::collections::HashMap;

use uuid::Uuid;

use super::{error::GenerationError, types::Ingredient};
use crate::{catalog::CatalogItem, lists::LineItem};

/// Flattens line items into ingredients, one per item and in list order.
///
/// Name and nutrition are copied out of `catalog`, so later catalog edits do
/// not reach a request that was already built. A single unresolved reference
/// fails the whole projection.
pub fn project(
    items: &[LineItem],
    catalog: &HashMap<Uuid, CatalogItem>,
) -> Result<Vec<Ingredient>, GenerationError> {
    items
        .iter()
        .map(|line| {
            let entry = catalog
                .get(&line.item)
                .ok_or(GenerationError::Projection(line.item))?;
            Ok(Ingredient {
                name: entry.name.clone(),
                quantity: line.quantity,
                nutrition: entry.nutrition.clone(),
            })
        })
        .collect()
}
