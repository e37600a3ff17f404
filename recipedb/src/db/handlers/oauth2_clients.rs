use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::handlers::OAuth2Clients;
use crate::db::models::Record;
use crate::db::models::oauth2_clients::OAuth2Client;

impl OAuth2Clients {
    /// Fetch a live client by its public client id, regardless of owner.
    #[instrument(skip(self), err)]
    pub async fn get_by_client_id(&self, client_id: &str) -> Result<Record<OAuth2Client>> {
        let statement = self
            .select()
            .where_eq("oauth2_clients.client_id", client_id)
            .where_null("oauth2_clients.archived_on")
            .build();
        let row = self
            .fetch_optional("fetching by client id from", &statement)
            .await?
            .ok_or(DbError::NotFound)?;
        self.scan_record(&row)
    }
}
