//! Database model for the preparation taxonomy.

use serde::{Deserialize, Serialize};

use crate::db::models::Entity;
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidPreparation {
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Whether the preparation is valid for every ingredient without an
    /// explicit ingredient-preparation link
    pub applicable_to_all_ingredients: bool,
}

impl Entity for ValidPreparation {
    type Chain = [u64; 0];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "valid_preparations",
        columns: &["name", "description", "icon", "applicable_to_all_ingredients"],
        ancestors: &[],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            description: scanner.next()?,
            icon: scanner.next()?,
            applicable_to_all_ingredients: scanner.next()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.description.as_str().into(),
            self.icon.as_str().into(),
            self.applicable_to_all_ingredients.into(),
        ]
    }
}
