//! Database model for user accounts.

use serde::{Deserialize, Serialize};

use crate::db::models::Entity;
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;
use crate::types::UnixTime;

/// A user account. Users are the root of every user-owned ownership chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(skip_serializing)]
    pub salt: Vec<u8>,
    pub password_last_changed_on: Option<UnixTime>,
    pub requires_password_change: bool,
    #[serde(skip_serializing)]
    pub two_factor_secret: String,
    pub two_factor_secret_verified_on: Option<UnixTime>,
    pub is_admin: bool,
}

impl Entity for User {
    type Chain = [u64; 0];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "users",
        columns: &[
            "username",
            "hashed_password",
            "salt",
            "password_last_changed_on",
            "requires_password_change",
            "two_factor_secret",
            "two_factor_secret_verified_on",
            "is_admin",
        ],
        ancestors: &[],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            username: scanner.next()?,
            hashed_password: scanner.next()?,
            salt: scanner.next()?,
            password_last_changed_on: scanner.optional_unsigned()?,
            requires_password_change: scanner.next()?,
            two_factor_secret: scanner.next()?,
            two_factor_secret_verified_on: scanner.optional_unsigned()?,
            is_admin: scanner.next()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.username.as_str().into(),
            self.hashed_password.as_str().into(),
            self.salt.clone().into(),
            self.password_last_changed_on.into(),
            self.requires_password_change.into(),
            self.two_factor_secret.as_str().into(),
            self.two_factor_secret_verified_on.into(),
            self.is_admin.into(),
        ]
    }
}
