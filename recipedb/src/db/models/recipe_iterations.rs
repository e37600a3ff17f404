//! Database model for an attempt at cooking a recipe.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::RecipeId;

/// One cook of a recipe and how it turned out. Ratings are free-form scores
/// chosen by the cook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIteration {
    pub recipe_id: RecipeId,
    pub end_difficulty_rating: f64,
    pub end_complexity_rating: f64,
    pub end_taste_rating: f64,
    pub end_overall_rating: f64,
    pub belongs_to_recipe: RecipeId,
}

impl Entity for RecipeIteration {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipe_iterations",
        columns: &[
            "recipe_id",
            "end_difficulty_rating",
            "end_complexity_rating",
            "end_taste_rating",
            "end_overall_rating",
            "belongs_to_recipe",
        ],
        ancestors: &[OWNED_BY_RECIPE],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            recipe_id: scanner.unsigned()?,
            end_difficulty_rating: scanner.next()?,
            end_complexity_rating: scanner.next()?,
            end_taste_rating: scanner.next()?,
            end_overall_rating: scanner.next()?,
            belongs_to_recipe: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.recipe_id.into(),
            self.end_difficulty_rating.into(),
            self.end_complexity_rating.into(),
            self.end_taste_rating.into(),
            self.end_overall_rating.into(),
            self.belongs_to_recipe.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe)
    }
}
