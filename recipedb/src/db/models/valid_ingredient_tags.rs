//! Database model for ingredient tags.

use serde::{Deserialize, Serialize};

use crate::db::models::Entity;
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidIngredientTag {
    pub name: String,
}

impl Entity for ValidIngredientTag {
    type Chain = [u64; 0];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "valid_ingredient_tags",
        columns: &["name"],
        ancestors: &[],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self { name: scanner.next()? })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.as_str().into()]
    }
}
