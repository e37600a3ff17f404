use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::handlers::Invitations;
use crate::db::models::Record;
use crate::db::models::invitations::Invitation;
use crate::db::schema::{ARCHIVED_ON_COLUMN, ID_COLUMN, LAST_UPDATED_ON_COLUMN};
use crate::db::sql::{CURRENT_UNIX_TIME, Update};

impl Invitations {
    /// Fetch a live, unconsumed invitation by code.
    #[instrument(skip(self, code), err)]
    pub async fn get_by_code(&self, code: &str) -> Result<Record<Invitation>> {
        let statement = self
            .select()
            .where_eq("invitations.code", code)
            .where_eq("invitations.consumed", false)
            .where_null("invitations.archived_on")
            .build();
        let row = self
            .fetch_optional("fetching by code from", &statement)
            .await?
            .ok_or(DbError::NotFound)?;
        self.scan_record(&row)
    }

    /// Consume an invitation. A code can be consumed only once.
    #[instrument(skip(self), err)]
    pub async fn mark_consumed(&self, id: u64) -> Result<()> {
        let statement = Update::table("invitations")
            .set("consumed", true)
            .set_expression(LAST_UPDATED_ON_COLUMN, CURRENT_UNIX_TIME)
            .where_eq("consumed", false)
            .where_null(ARCHIVED_ON_COLUMN)
            .where_eq(ID_COLUMN, id)
            .build();

        match self.execute("consuming", &statement).await? {
            0 => Err(DbError::NotFound),
            _ => Ok(()),
        }
    }
}
