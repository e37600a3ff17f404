//! Database model for what a recipe step produces.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::RecipeStepId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStepProduct {
    pub name: String,
    pub recipe_step_id: RecipeStepId,
    pub belongs_to_recipe_step: RecipeStepId,
}

impl Entity for RecipeStepProduct {
    type Chain = [u64; 2];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipe_step_products",
        columns: &["name", "recipe_step_id", "belongs_to_recipe_step"],
        ancestors: &[OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            recipe_step_id: scanner.unsigned()?,
            belongs_to_recipe_step: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.recipe_step_id.into(),
            self.belongs_to_recipe_step.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe_step)
    }
}
