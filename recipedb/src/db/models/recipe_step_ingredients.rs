//! Database model for the ingredients consumed by a recipe step.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{RecipeStepId, ValidIngredientId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStepIngredient {
    /// Unset when the ingredient is the product of an earlier step
    pub ingredient_id: Option<ValidIngredientId>,
    pub quantity_type: String,
    pub quantity_value: f64,
    pub quantity_notes: String,
    pub product_of_recipe: bool,
    pub ingredient_notes: String,
    pub belongs_to_recipe_step: RecipeStepId,
}

impl Entity for RecipeStepIngredient {
    type Chain = [u64; 2];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipe_step_ingredients",
        columns: &[
            "ingredient_id",
            "quantity_type",
            "quantity_value",
            "quantity_notes",
            "product_of_recipe",
            "ingredient_notes",
            "belongs_to_recipe_step",
        ],
        ancestors: &[OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            ingredient_id: scanner.optional_unsigned()?,
            quantity_type: scanner.next()?,
            quantity_value: scanner.next()?,
            quantity_notes: scanner.next()?,
            product_of_recipe: scanner.next()?,
            ingredient_notes: scanner.next()?,
            belongs_to_recipe_step: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.ingredient_id.into(),
            self.quantity_type.as_str().into(),
            self.quantity_value.into(),
            self.quantity_notes.as_str().into(),
            self.product_of_recipe.into(),
            self.ingredient_notes.as_str().into(),
            self.belongs_to_recipe_step.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe_step)
    }
}
