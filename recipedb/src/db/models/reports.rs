//! Database model for user-submitted reports.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_USER};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_type: String,
    pub concern: String,
    pub belongs_to_user: UserId,
}

impl Entity for Report {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "reports",
        columns: &["report_type", "concern", "belongs_to_user"],
        ancestors: &[OWNED_BY_USER],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            report_type: scanner.next()?,
            concern: scanner.next()?,
            belongs_to_user: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.report_type.as_str().into(),
            self.concern.as_str().into(),
            self.belongs_to_user.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_user)
    }
}
