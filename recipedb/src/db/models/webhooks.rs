//! Database model for outbound webhook subscriptions.

use serde::{Deserialize, Serialize};

use crate::db::errors::Result;
use crate::db::models::{Entity, OWNED_BY_USER, validate_list};
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::UserId;

/// A webhook subscription owned by a user.
///
/// `events`, `data_types` and `topics` are each persisted as a single
/// comma-joined TEXT column. An empty list is stored as the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub method: String,
    pub events: Vec<String>,
    pub data_types: Vec<String>,
    pub topics: Vec<String>,
    pub belongs_to_user: UserId,
}

impl Entity for Webhook {
    type Chain = [u64; 1];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "webhooks",
        columns: &[
            "name",
            "content_type",
            "url",
            "method",
            "events",
            "data_types",
            "topics",
            "belongs_to_user",
        ],
        ancestors: &[OWNED_BY_USER],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            content_type: scanner.next()?,
            url: scanner.next()?,
            method: scanner.next()?,
            events: scanner.list()?,
            data_types: scanner.list()?,
            topics: scanner.list()?,
            belongs_to_user: scanner.unsigned()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.content_type.as_str().into(),
            self.url.as_str().into(),
            self.method.as_str().into(),
            SqlValue::list(&self.events),
            SqlValue::list(&self.data_types),
            SqlValue::list(&self.topics),
            self.belongs_to_user.into(),
        ]
    }

    fn owner(&self) -> Option<u64> {
        Some(self.belongs_to_user)
    }

    fn validate(&self) -> Result<()> {
        validate_list("events", &self.events)?;
        validate_list("data_types", &self.data_types)?;
        validate_list("topics", &self.topics)
    }
}
