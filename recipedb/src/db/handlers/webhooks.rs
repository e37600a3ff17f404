use tracing::instrument;

use crate::db::errors::Result;
use crate::db::filter::{Page, QueryFilter};
use crate::db::handlers::Webhooks;
use crate::db::models::{Entity, Record};
use crate::db::models::webhooks::Webhook;

impl Webhooks {
    /// One page of live webhooks across every user, for event dispatch.
    #[instrument(skip(self), err)]
    pub async fn list_all(&self, filter: &QueryFilter) -> Result<Page<Record<Webhook>>> {
        let select = self
            .select()
            .expression(self.live_count_expression())
            .where_null("webhooks.archived_on")
            .order_by("webhooks.id");
        let statement = filter.apply(select, Webhook::SCHEMA).build();

        let rows = self.fetch_all("listing every", &statement).await?;
        let (items, total_count) = self.scan_records(&rows, true)?;
        Ok(Page {
            items,
            page: filter.page(),
            limit: filter.limit(),
            total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::db::handlers::Repository;
    use crate::test_utils::{create_test_user, database};
    use sqlx::PgPool;

    fn webhook(owner: u64, events: &[&str]) -> Webhook {
        Webhook {
            name: "notify".to_string(),
            content_type: "application/json".to_string(),
            url: "https://example.com/hook".to_string(),
            method: "POST".to_string(),
            events: events.iter().map(|e| e.to_string()).collect(),
            data_types: vec!["recipe".to_string()],
            topics: Vec::new(),
            belongs_to_user: owner,
        }
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_lists_round_trip(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "hooks").await;
        let created = db
            .webhooks
            .create(Webhook {
                data_types: Vec::new(),
                topics: vec!["recipes".to_string()],
                ..webhook(user.id, &["created", "updated"])
            })
            .await
            .unwrap();

        let fetched = db.webhooks.get([user.id], created.id).await.unwrap();
        assert_eq!(fetched.data.events, vec!["created", "updated"]);
        assert!(fetched.data.data_types.is_empty());
        assert_eq!(fetched.data.topics, vec!["recipes"]);

        let (events, data_types): (String, String) =
            sqlx::query_as("SELECT events, data_types FROM webhooks WHERE id = $1")
                .bind(created.id as i64)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(events, "created,updated");
        assert_eq!(data_types, "");
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_comma_in_list_entry_is_rejected(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "hooks").await;

        let err = db.webhooks.create(webhook(user.id, &["a,b"])).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { field: "events", .. }), "got {err:?}");
        assert_eq!(db.webhooks.count().await.unwrap(), 0);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_list_all_spans_owners(pool: PgPool) {
        let db = database(pool).await;
        let alice = create_test_user(&db, "alice").await;
        let bob = create_test_user(&db, "bob").await;
        let first = db.webhooks.create(webhook(alice.id, &["a"])).await.unwrap();
        let second = db.webhooks.create(webhook(bob.id, &["b"])).await.unwrap();
        let archived = db.webhooks.create(webhook(bob.id, &["c"])).await.unwrap();
        db.webhooks.archive([bob.id], archived.id).await.unwrap();

        let page = db.webhooks.list_all(&QueryFilter::default()).await.unwrap();
        let ids: Vec<u64> = page.items.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(page.total_count, 2);

        let own = db.webhooks.list([alice.id], &QueryFilter::default()).await.unwrap();
        assert_eq!(own.items.len(), 1);
        assert_eq!(own.items[0].id, first.id);
    }
}
