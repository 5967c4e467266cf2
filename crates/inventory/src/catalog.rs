use async_trait::async_trait;
use common::{IngredientGroupId, ItemId};

use crate::{IngredientGroupDefinition, ItemDefinition, Result};

/// Read access to item and ingredient-group definitions.
///
/// Lookups return `Ok(None)` for unknown ids; it is up to the caller to
/// decide whether a missing definition is an error.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolves an item definition by id.
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<ItemDefinition>>;

    /// Resolves an ingredient-group definition by id.
    async fn get_ingredient_group(
        &self,
        group_id: &IngredientGroupId,
    ) -> Result<Option<IngredientGroupDefinition>>;
}
