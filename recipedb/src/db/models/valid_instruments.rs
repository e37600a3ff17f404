//! Database model for the instrument taxonomy.

use serde::{Deserialize, Serialize};

use crate::db::models::Entity;
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidInstrument {
    pub name: String,
    pub variant: String,
    pub description: String,
    pub icon: String,
}

impl Entity for ValidInstrument {
    type Chain = [u64; 0];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "valid_instruments",
        columns: &["name", "variant", "description", "icon"],
        ancestors: &[],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            variant: scanner.next()?,
            description: scanner.next()?,
            icon: scanner.next()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.variant.as_str().into(),
            self.description.as_str().into(),
            self.icon.as_str().into(),
        ]
    }
}
