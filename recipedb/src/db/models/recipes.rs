//! Database model for recipes.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_USER};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{RecipeId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub source: String,
    pub description: String,
    /// The recipe this one was adapted from, if any
    pub inspired_by_recipe_id: Option<RecipeId>,
    pub belongs_to_user: UserId,
}

impl Entity for Recipe {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "recipes",
        columns: &["name", "source", "description", "inspired_by_recipe_id", "belongs_to_user"],
        ancestors: &[OWNED_BY_USER],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            source: scanner.next()?,
            description: scanner.next()?,
            inspired_by_recipe_id: scanner.optional_unsigned()?,
            belongs_to_user: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.source.as_str().into(),
            self.description.as_str().into(),
            self.inspired_by_recipe_id.into(),
            self.belongs_to_user.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_user)
    }
}
