//! Database model for invitation codes.

use serde::{Deserialize, Serialize};

use crate::db::models::{Entity, OWNED_BY_USER};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::UserId;

/// An invitation issued by a user. Codes are unique across all users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub code: String,
    pub consumed: bool,
    pub belongs_to_user: UserId,
}

impl Entity for Invitation {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "invitations",
        columns: &["code", "consumed", "belongs_to_user"],
        ancestors: &[OWNED_BY_USER],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            code: scanner.next()?,
            consumed: scanner.next()?,
            belongs_to_user: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.code.as_str().into(),
            self.consumed.into(),
            self.belongs_to_user.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_user)
    }
}
