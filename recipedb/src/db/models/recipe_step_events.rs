//! Database model for events recorded against a recipe step while cooking.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{RecipeIterationId, RecipeStepId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStepEvent {
    pub event_type: String,
    pub done: bool,
    pub recipe_iteration_id: RecipeIterationId,
    pub recipe_step_id: RecipeStepId,
    pub belongs_to_recipe_step: RecipeStepId,
}

impl Entity for RecipeStepEvent {
    type Chain = [u64; 2];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipe_step_events",
        columns: &[
            "event_type",
            "done",
            "recipe_iteration_id",
            "recipe_step_id",
            "belongs_to_recipe_step",
        ],
        ancestors: &[OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            event_type: scanner.next()?,
            done: scanner.next()?,
            recipe_iteration_id: scanner.unsigned()?,
            recipe_step_id: scanner.unsigned()?,
            belongs_to_recipe_step: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.event_type.as_str().into(),
            self.done.into(),
            self.recipe_iteration_id.into(),
            self.recipe_step_id.into(),
            self.belongs_to_recipe_step.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe_step)
    }
}
