//! Database model for photos and other media attached to a recipe iteration.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE, OWNED_BY_RECIPE_ITERATION};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{RecipeIterationId, RecipeStepId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationMedia {
    pub path: String,
    pub mimetype: String,
    pub recipe_iteration_id: RecipeIterationId,
    /// Set when the media documents a particular step
    pub recipe_step_id: Option<RecipeStepId>,
    pub belongs_to_recipe_iteration: RecipeIterationId,
}

impl Entity for IterationMedia {
    /// `[recipe, recipe iteration]`
    type Chain = [u64; 2];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "iteration_medias",
        columns: &[
            "path",
            "mimetype",
            "recipe_iteration_id",
            "recipe_step_id",
            "belongs_to_recipe_iteration",
        ],
        ancestors: &[OWNED_BY_RECIPE, OWNED_BY_RECIPE_ITERATION],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            path: scanner.next()?,
            mimetype: scanner.next()?,
            recipe_iteration_id: scanner.unsigned()?,
            recipe_step_id: scanner.optional_unsigned()?,
            belongs_to_recipe_iteration: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.path.as_str().into(),
            self.mimetype.as_str().into(),
            self.recipe_iteration_id.into(),
            self.recipe_step_id.into(),
            self.belongs_to_recipe_iteration.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe_iteration)
    }
}
