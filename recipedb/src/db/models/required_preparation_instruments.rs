//! Database model for instruments a preparation cannot be done without.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_VALID_PREPARATION};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::{ValidInstrumentId, ValidPreparationId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredPreparationInstrument {
    pub instrument_id: ValidInstrumentId,
    pub preparation_id: ValidPreparationId,
    pub notes: String,
    pub belongs_to_valid_preparation: ValidPreparationId,
}

impl Entity for RequiredPreparationInstrument {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "required_preparation_instruments",
        columns: &["instrument_id", "preparation_id", "notes", "belongs_to_valid_preparation"],
        ancestors: &[OWNED_BY_VALID_PREPARATION],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            instrument_id: scanner.unsigned()?,
            preparation_id: scanner.unsigned()?,
            notes: scanner.next()?,
            belongs_to_valid_preparation: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.instrument_id.into(),
            self.preparation_id.into(),
            self.notes.as_str().into(),
            self.belongs_to_valid_preparation.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_valid_preparation)
    }
}
