//! Database model for OAuth2 client registrations.

use serde::{Deserialize, Serialize};

use crate::db::errors::Result;
use crate::db::models::{Entity, OWNED_BY_USER, validate_list};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::UserId;

/// An OAuth2 client owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Client {
    pub name: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_uri: String,
    /// Stored comma-joined; see [`validate_list`].
    pub scopes: Vec<String>,
    pub belongs_to_user: UserId,
}

impl Entity for OAuth2Client {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "oauth2_clients",
        columns: &["name", "client_id", "client_secret", "redirect_uri", "scopes", "belongs_to_user"],
        ancestors: &[OWNED_BY_USER],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            client_id: scanner.next()?,
            client_secret: scanner.next()?,
            redirect_uri: scanner.next()?,
            scopes: scanner.list()?,
            belongs_to_user: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.client_id.as_str().into(),
            self.client_secret.as_str().into(),
            self.redirect_uri.as_str().into(),
            SqlValue::list(&self.scopes),
            self.belongs_to_user.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_user)
    }

    fn validate(&self) -> Result<()> {
        validate_list("scopes", &self.scopes)
    }
}
