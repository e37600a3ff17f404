//! Lookups and credential updates specific to the users table.

use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::handlers::Users;
use crate::db::models::Record;
use crate::db::models::users::User;
use crate::db::scan::RowScanner;
use crate::db::schema::{ARCHIVED_ON_COLUMN, ID_COLUMN, LAST_UPDATED_ON_COLUMN};
use crate::db::sql::{CURRENT_UNIX_TIME, Update};
use crate::types::{UnixTime, UserId};

impl Users {
    /// Fetch a live user by username.
    #[instrument(skip(self, username), err)]
    pub async fn get_by_username(&self, username: &str) -> Result<Record<User>> {
        let statement = self
            .select()
            .where_eq("users.username", username)
            .where_null("users.archived_on")
            .build();
        let row = self
            .fetch_optional("fetching by username from", &statement)
            .await?
            .ok_or(DbError::NotFound)?;
        self.scan_record(&row)
    }

    /// Replace a live user's password hash, clearing any forced change.
    /// Returns the new change time.
    #[instrument(skip(self, hashed_password), err)]
    pub async fn update_password(&self, id: UserId, hashed_password: &str) -> Result<UnixTime> {
        let statement = Update::table("users")
            .set("hashed_password", hashed_password)
            .set("requires_password_change", false)
            .set_expression("password_last_changed_on", CURRENT_UNIX_TIME)
            .set_expression(LAST_UPDATED_ON_COLUMN, CURRENT_UNIX_TIME)
            .where_null(ARCHIVED_ON_COLUMN)
            .where_eq(ID_COLUMN, id)
            .returning(["password_last_changed_on"])
            .build();

        let row = self
            .fetch_optional("updating password in", &statement)
            .await?
            .ok_or(DbError::NotFound)?;
        RowScanner::new(&row)
            .unsigned()
            .map_err(|err| DbError::during("reading password change time", err))
    }

    /// Mark the two-factor secret verified. Only a not-yet-verified secret
    /// can be verified; anything else is reported as not found.
    #[instrument(skip(self), err)]
    pub async fn mark_two_factor_secret_verified(&self, id: UserId) -> Result<()> {
        let statement = Update::table("users")
            .set_expression("two_factor_secret_verified_on", CURRENT_UNIX_TIME)
            .set_expression(LAST_UPDATED_ON_COLUMN, CURRENT_UNIX_TIME)
            .where_null("two_factor_secret_verified_on")
            .where_null(ARCHIVED_ON_COLUMN)
            .where_eq(ID_COLUMN, id)
            .build();

        match self.execute("verifying two factor secret in", &statement).await? {
            0 => Err(DbError::NotFound),
            _ => Ok(()),
        }
    }
}
