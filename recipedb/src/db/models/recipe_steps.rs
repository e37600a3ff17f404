//! Database model for the ordered steps of a recipe.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{RecipeId, RecipeStepId, ValidPreparationId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    /// Position of the step within its recipe
    pub index: u32,
    pub preparation_id: ValidPreparationId,
    pub prerequisite_step: RecipeStepId,
    pub min_estimated_time_in_seconds: u32,
    pub max_estimated_time_in_seconds: u32,
    pub temperature_in_celsius: Option<u16>,
    pub notes: String,
    pub recipe_id: RecipeId,
    pub belongs_to_recipe: RecipeId,
}

impl Entity for RecipeStep {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipe_steps",
        columns: &[
            "index",
            "preparation_id",
            "prerequisite_step",
            "min_estimated_time_in_seconds",
            "max_estimated_time_in_seconds",
            "temperature_in_celsius",
            "notes",
            "recipe_id",
            "belongs_to_recipe",
        ],
        ancestors: &[OWNED_BY_RECIPE],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            index: scanner.unsigned()?,
            preparation_id: scanner.unsigned()?,
            prerequisite_step: scanner.unsigned()?,
            min_estimated_time_in_seconds: scanner.unsigned()?,
            max_estimated_time_in_seconds: scanner.unsigned()?,
            temperature_in_celsius: scanner.optional_unsigned()?,
            notes: scanner.next()?,
            recipe_id: scanner.unsigned()?,
            belongs_to_recipe: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.index.into(),
            self.preparation_id.into(),
            self.prerequisite_step.into(),
            self.min_estimated_time_in_seconds.into(),
            self.max_estimated_time_in_seconds.into(),
            self.temperature_in_celsius.into(),
            self.notes.as_str().into(),
            self.recipe_id.into(),
            self.belongs_to_recipe.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe)
    }
}
