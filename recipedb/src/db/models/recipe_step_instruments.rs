//! Database model for instruments used by a recipe step.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{RecipeStepId, ValidInstrumentId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStepInstrument {
    /// Unset when the instrument is described only in `notes`
    pub instrument_id: Option<ValidInstrumentId>,
    pub recipe_step_id: RecipeStepId,
    pub notes: String,
    pub belongs_to_recipe_step: RecipeStepId,
}

impl Entity for RecipeStepInstrument {
    /// `[recipe, recipe step]`
    type Chain = [u64; 2];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipe_step_instruments",
        columns: &["instrument_id", "recipe_step_id", "notes", "belongs_to_recipe_step"],
        ancestors: &[OWNED_BY_RECIPE, OWNED_BY_RECIPE_STEP],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            instrument_id: scanner.optional_unsigned()?,
            recipe_step_id: scanner.unsigned()?,
            notes: scanner.next()?,
            belongs_to_recipe_step: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.instrument_id.into(),
            self.recipe_step_id.into(),
            self.notes.as_str().into(),
            self.belongs_to_recipe_step.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_recipe_step)
    }
}
