//! Database model linking ingredients to the preparations that apply to them.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_VALID_INGREDIENT};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{ValidIngredientId, ValidPreparationId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidIngredientPreparation {
    pub notes: String,
    pub valid_preparation_id: ValidPreparationId,
    pub valid_ingredient_id: ValidIngredientId,
    pub belongs_to_valid_ingredient: ValidIngredientId,
}

impl Entity for ValidIngredientPreparation {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "valid_ingredient_preparations",
        columns: &[
            "notes",
            "valid_preparation_id",
            "valid_ingredient_id",
            "belongs_to_valid_ingredient",
        ],
        ancestors: &[OWNED_BY_VALID_INGREDIENT],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            notes: scanner.next()?,
            valid_preparation_id: scanner.unsigned()?,
            valid_ingredient_id: scanner.unsigned()?,
            belongs_to_valid_ingredient: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.notes.as_str().into(),
            self.valid_preparation_id.into(),
            self.valid_ingredient_id.into(),
            self.belongs_to_valid_ingredient.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_valid_ingredient)
    }
}
