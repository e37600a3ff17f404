//! Base repository trait and its generic implementation over [`Entity`] tables.
//!
//! Every entity shares one operation set: existence checks, single fetches,
//! filtered lists with a live-row total, ordered fetches by id, creation,
//! update, soft archival and a bucketed full-table stream. [`EntityStore`]
//! implements all of it once, driven by the entity's [`TableSchema`]; the
//! per-entity handler modules only add lookups that are specific to a table.
//!
//! Reads pin the caller's ownership chain (see
//! [`TableSchema::constrain_ownership`]) so a row owned by someone else
//! behaves exactly like a missing row.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use anyhow::anyhow;
use futures::StreamExt;
use futures::stream;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, instrument};

use crate::db::errors::{DbError, Result};
use crate::db::filter::{DEFAULT_LIMIT, Page, QueryFilter};
use crate::db::models::{Entity, Record};
use crate::db::scan::RowScanner;
use crate::db::schema::{ARCHIVED_ON_COLUMN, CREATED_ON_COLUMN, ID_COLUMN, LAST_UPDATED_ON_COLUMN};
use crate::db::sql::{CURRENT_UNIX_TIME, Insert, Select, SqlValue, Statement, Update};

/// Tuning shared by every repository on a [`Database`](crate::Database).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySettings {
    /// Deadline applied to each individual statement. `None` disables it.
    #[serde(with = "humantime_serde")]
    pub query_timeout: Option<Duration>,
    /// Width of the id range each streaming worker loads at once
    pub get_all_bucket_size: u64,
    /// Concurrent streaming workers, further capped by the pool size
    pub get_all_workers: usize,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            query_timeout: Some(Duration::from_secs(30)),
            get_all_bucket_size: 1000,
            get_all_workers: 4,
        }
    }
}

/// Base repository trait providing the operations common to every entity
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// The entity stored in this repository
    type Entity: Entity;

    /// Ancestor identifiers, root first
    type Chain: Send + Sync;

    /// Whether a live row with this id exists beneath the chain
    async fn exists(&self, chain: Self::Chain, id: u64) -> Result<bool>;

    /// Fetch one row beneath the chain, archived or not
    async fn get(&self, chain: Self::Chain, id: u64) -> Result<Record<Self::Entity>>;

    /// One page of live rows beneath the chain, ordered by id
    async fn list(&self, chain: Self::Chain, filter: &QueryFilter) -> Result<Page<Record<Self::Entity>>>;

    /// Live rows beneath the chain whose ids appear in `ids`, in the order
    /// given, at most `limit` of them (0 means the default limit)
    async fn get_with_ids(&self, chain: Self::Chain, limit: u8, ids: &[u64]) -> Result<Vec<Record<Self::Entity>>>;

    /// Insert a new row
    async fn create(&self, input: Self::Entity) -> Result<Record<Self::Entity>>;

    /// Rewrite every mutable column of an existing row
    async fn update(&self, record: &mut Record<Self::Entity>) -> Result<()>;

    /// Soft-delete a live row
    async fn archive(&self, chain: Self::Chain, id: u64) -> Result<()>;

    /// Number of live rows in the table
    async fn count(&self) -> Result<u64>;

    /// Stream every live row, one id bucket per message, until done or cancelled.
    ///
    /// Returns once the highest live id is known; the buckets are loaded by a
    /// background task that closes `sink` when it finishes. Dropping the
    /// receiver stops the remaining workers.
    async fn get_all(&self, sink: mpsc::Sender<Vec<Record<Self::Entity>>>, cancel: CancellationToken) -> Result<()>;
}

/// Repository over one entity table.
pub struct EntityStore<E> {
    pool: PgPool,
    settings: RepositorySettings,
    live_count: OnceCell<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            settings: self.settings.clone(),
            live_count: self.live_count.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new(pool: PgPool, settings: RepositorySettings) -> Self {
        Self {
            pool,
            settings,
            live_count: OnceCell::new(),
            _entity: PhantomData,
        }
    }

    /// All envelope and data columns of the table.
    pub(crate) fn select(&self) -> Select {
        Select::from_table(E::SCHEMA.table).columns(E::SCHEMA.select_columns())
    }

    /// The live-row count sub-select, rendered once per repository.
    pub(crate) fn live_count_expression(&self) -> &str {
        self.live_count.get_or_init(|| E::SCHEMA.live_count_expression())
    }

    async fn with_deadline<T, F>(&self, operation: &str, query: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        let outcome = match self.settings.query_timeout {
            Some(limit) => tokio::time::timeout(limit, query).await.map_err(|_| DbError::Timeout {
                operation: format!("{operation} {}", E::SCHEMA.table),
            })?,
            None => query.await,
        };
        outcome.map_err(|err| DbError::during(&format!("{operation} {}", E::SCHEMA.table), err))
    }

    pub(crate) async fn fetch_optional(&self, operation: &str, statement: &Statement) -> Result<Option<PgRow>> {
        ensure_built(statement)?;
        self.with_deadline(operation, statement.query().fetch_optional(&self.pool)).await
    }

    pub(crate) async fn fetch_all(&self, operation: &str, statement: &Statement) -> Result<Vec<PgRow>> {
        ensure_built(statement)?;
        self.with_deadline(operation, statement.query().fetch_all(&self.pool)).await
    }

    /// Executes a statement and returns the number of rows it affected.
    pub(crate) async fn execute(&self, operation: &str, statement: &Statement) -> Result<u64> {
        ensure_built(statement)?;
        let result = self.with_deadline(operation, statement.query().execute(&self.pool)).await?;
        Ok(result.rows_affected())
    }

    /// Decodes one row in select order, plus the trailing count column when
    /// the query carried one.
    fn scan_row(row: &PgRow, with_count: bool) -> std::result::Result<(Record<E>, u64), sqlx::Error> {
        let mut scanner = RowScanner::new(row);
        let id = scanner.unsigned()?;
        let data = E::scan(&mut scanner)?;
        let record = Record {
            id,
            created_on: scanner.unsigned()?,
            last_updated_on: scanner.optional_unsigned()?,
            archived_on: scanner.optional_unsigned()?,
            data,
        };
        let count = if with_count { scanner.unsigned()? } else { 0 };
        Ok((record, count))
    }

    pub(crate) fn scan_record(&self, row: &PgRow) -> Result<Record<E>> {
        Self::scan_row(row, false)
            .map(|(record, _)| record)
            .map_err(|err| DbError::during(&format!("scanning {}", E::SCHEMA.table), err))
    }

    /// Decodes every row. The total is the first non-zero count seen.
    pub(crate) fn scan_records(&self, rows: &[PgRow], with_count: bool) -> Result<(Vec<Record<E>>, u64)> {
        let mut total = 0;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let (record, count) = Self::scan_row(row, with_count)
                .map_err(|err| DbError::during(&format!("scanning {}", E::SCHEMA.table), err))?;
            if total == 0 {
                total = count;
            }
            records.push(record);
        }
        Ok((records, total))
    }

    async fn load_bucket(&self, begin: u64, end: u64) -> Result<Vec<Record<E>>> {
        let statement = self
            .select()
            .where_gte(&E::SCHEMA.qualified(ID_COLUMN), begin)
            .where_lt(&E::SCHEMA.qualified(ID_COLUMN), end)
            .where_null(&E::SCHEMA.qualified(ARCHIVED_ON_COLUMN))
            .order_by(E::SCHEMA.qualified(ID_COLUMN))
            .build();
        let rows = self.fetch_all("streaming", &statement).await?;
        Ok(self.scan_records(&rows, false)?.0)
    }

    async fn stream_bucket(&self, begin: u64, end: u64, sink: &mpsc::Sender<Vec<Record<E>>>, cancel: &CancellationToken) {
        if cancel.is_cancelled() || sink.is_closed() {
            return;
        }

        let loaded = tokio::select! {
            _ = cancel.cancelled() => return,
            loaded = self.load_bucket(begin, end) => loaded,
        };
        let records = match loaded {
            Ok(records) if records.is_empty() => return,
            Ok(records) => records,
            Err(err) => {
                error!(table = E::SCHEMA.table, begin, end, error = %err, "failed to load bucket");
                return;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {}
            sent = sink.send(records) => {
                if sent.is_err() {
                    debug!(table = E::SCHEMA.table, begin, "stream receiver dropped");
                }
            }
        }
    }
}

fn ensure_built(statement: &Statement) -> Result<()> {
    if statement.is_empty() {
        return Err(DbError::Other(anyhow!("attempted to execute an empty query")));
    }
    Ok(())
}

#[async_trait::async_trait]
impl<E: Entity> Repository for EntityStore<E> {
    type Entity = E;
    type Chain = E::Chain;

    #[instrument(skip(self), fields(table = E::SCHEMA.table), err)]
    async fn exists(&self, chain: E::Chain, id: u64) -> Result<bool> {
        let select = Select::from_table(E::SCHEMA.table)
            .columns([E::SCHEMA.qualified(ID_COLUMN)])
            .where_null(&E::SCHEMA.qualified(ARCHIVED_ON_COLUMN));
        let statement = E::SCHEMA.constrain_ownership(select, chain.as_ref(), Some(id)).build().exists();

        match self.fetch_optional("checking existence in", &statement).await? {
            Some(row) => row
                .try_get::<bool, _>(0)
                .map_err(|err| DbError::during("reading existence flag", err)),
            None => Ok(false),
        }
    }

    #[instrument(skip(self), fields(table = E::SCHEMA.table), err)]
    async fn get(&self, chain: E::Chain, id: u64) -> Result<Record<E>> {
        let statement = E::SCHEMA.constrain_ownership(self.select(), chain.as_ref(), Some(id)).build();
        let row = self.fetch_optional("fetching from", &statement).await?.ok_or(DbError::NotFound)?;
        self.scan_record(&row)
    }

    #[instrument(skip(self), fields(table = E::SCHEMA.table), err)]
    async fn list(&self, chain: E::Chain, filter: &QueryFilter) -> Result<Page<Record<E>>> {
        let select = self
            .select()
            .expression(self.live_count_expression())
            .where_null(&E::SCHEMA.qualified(ARCHIVED_ON_COLUMN));
        let select = E::SCHEMA
            .constrain_ownership(select, chain.as_ref(), None)
            .order_by(E::SCHEMA.qualified(ID_COLUMN));
        let statement = filter.apply(select, E::SCHEMA).build();

        let rows = self.fetch_all("listing", &statement).await?;
        let (items, total_count) = self.scan_records(&rows, true)?;
        Ok(Page {
            items,
            page: filter.page(),
            limit: filter.limit(),
            total_count,
        })
    }

    #[instrument(skip(self, ids), fields(table = E::SCHEMA.table, requested = ids.len()), err)]
    async fn get_with_ids(&self, chain: E::Chain, limit: u8, ids: &[u64]) -> Result<Vec<Record<E>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };

        let select = self
            .select()
            .join_with(
                format!(
                    "unnest(?::int8[]) WITH ORDINALITY AS requested(id, ord) ON requested.id = {}",
                    E::SCHEMA.qualified(ID_COLUMN)
                ),
                vec![SqlValue::ids(ids)],
            )
            .where_null(&E::SCHEMA.qualified(ARCHIVED_ON_COLUMN));
        let statement = E::SCHEMA
            .constrain_ownership(select, chain.as_ref(), None)
            .order_by("requested.ord")
            .limit(u64::from(limit))
            .build();

        let rows = self.fetch_all("fetching by ids from", &statement).await?;
        Ok(self.scan_records(&rows, false)?.0)
    }

    #[instrument(skip(self, input), fields(table = E::SCHEMA.table), err)]
    async fn create(&self, input: E) -> Result<Record<E>> {
        input.validate()?;
        let statement = Insert::into_table(E::SCHEMA.table)
            .columns(E::SCHEMA.columns.iter().copied())
            .values(input.values())
            .returning([ID_COLUMN, CREATED_ON_COLUMN])
            .build();

        let row = self
            .fetch_optional("inserting into", &statement)
            .await?
            .ok_or_else(|| DbError::Other(anyhow!("insert into {} returned no row", E::SCHEMA.table)))?;
        let mut scanner = RowScanner::new(&row);
        let id = scanner.unsigned().map_err(|err| DbError::during("reading inserted id", err))?;
        let created_on = scanner
            .unsigned()
            .map_err(|err| DbError::during("reading inserted timestamp", err))?;

        debug!(table = E::SCHEMA.table, id, "created");
        Ok(Record {
            id,
            created_on,
            last_updated_on: None,
            archived_on: None,
            data: input,
        })
    }

    #[instrument(skip(self, record), fields(table = E::SCHEMA.table, id = record.id), err)]
    async fn update(&self, record: &mut Record<E>) -> Result<()> {
        record.data.validate()?;
        let values = record.data.values();
        if values.len() != E::SCHEMA.columns.len() {
            return Err(DbError::Other(anyhow!(
                "{} produced {} values for {} columns",
                E::SCHEMA.table,
                values.len(),
                E::SCHEMA.columns.len()
            )));
        }

        let owner_column = E::SCHEMA.owner_column();
        let mut update = Update::table(E::SCHEMA.table);
        for (column, value) in E::SCHEMA.columns.iter().zip(values) {
            if Some(*column) != owner_column {
                update = update.set(column, value);
            }
        }
        update = update.set_expression(LAST_UPDATED_ON_COLUMN, CURRENT_UNIX_TIME);
        if let (Some(column), Some(owner)) = (owner_column, record.data.owner()) {
            update = update.where_eq(column, owner);
        }
        let statement = update
            .where_eq(ID_COLUMN, record.id)
            .returning([LAST_UPDATED_ON_COLUMN])
            .build();

        let row = self.fetch_optional("updating", &statement).await?.ok_or(DbError::NotFound)?;
        let last_updated_on = RowScanner::new(&row)
            .unsigned()
            .map_err(|err| DbError::during("reading update timestamp", err))?;
        record.last_updated_on = Some(last_updated_on);
        Ok(())
    }

    #[instrument(skip(self), fields(table = E::SCHEMA.table), err)]
    async fn archive(&self, chain: E::Chain, id: u64) -> Result<()> {
        let mut update = Update::table(E::SCHEMA.table)
            .set_expression(LAST_UPDATED_ON_COLUMN, CURRENT_UNIX_TIME)
            .set_expression(ARCHIVED_ON_COLUMN, CURRENT_UNIX_TIME)
            .where_null(ARCHIVED_ON_COLUMN);
        if let (Some(column), Some(owner)) = (E::SCHEMA.owner_column(), chain.as_ref().last()) {
            update = update.where_eq(column, *owner);
        }
        let statement = update.where_eq(ID_COLUMN, id).build();

        match self.execute("archiving in", &statement).await? {
            0 => Err(DbError::NotFound),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self), fields(table = E::SCHEMA.table), err)]
    async fn count(&self) -> Result<u64> {
        let statement = Select::from_table(E::SCHEMA.table)
            .expression(format!("COUNT({})", E::SCHEMA.qualified(ID_COLUMN)))
            .where_null(&E::SCHEMA.qualified(ARCHIVED_ON_COLUMN))
            .build();
        let row = self.fetch_optional("counting", &statement).await?.ok_or(DbError::NotFound)?;
        RowScanner::new(&row)
            .unsigned()
            .map_err(|err| DbError::during("reading count", err))
    }

    #[instrument(skip(self, sink, cancel), fields(table = E::SCHEMA.table), err)]
    async fn get_all(&self, sink: mpsc::Sender<Vec<Record<E>>>, cancel: CancellationToken) -> Result<()> {
        let statement = Select::from_table(E::SCHEMA.table)
            .expression(format!("MAX({})", E::SCHEMA.qualified(ID_COLUMN)))
            .where_null(&E::SCHEMA.qualified(ARCHIVED_ON_COLUMN))
            .build();
        let highest = match self.fetch_optional("finding highest id in", &statement).await? {
            Some(row) => RowScanner::new(&row)
                .optional_unsigned::<u64>()
                .map_err(|err| DbError::during("reading highest id", err))?,
            None => None,
        };
        let Some(highest) = highest else {
            return Ok(());
        };

        let bucket_size = self.settings.get_all_bucket_size.max(1);
        let pool_size = self.pool.options().get_max_connections().max(1) as usize;
        let workers = self.settings.get_all_workers.clamp(1, pool_size);
        debug!(highest, bucket_size, workers, "streaming table");

        let store = self.clone();
        tokio::spawn(
            async move {
                let (store, sink, token) = (&store, &sink, &cancel);
                stream::iter(0..=highest / bucket_size)
                    .take_until(token.cancelled())
                    .for_each_concurrent(workers, move |bucket| {
                        let begin = bucket * bucket_size;
                        let end = begin.saturating_add(bucket_size);
                        async move { store.stream_bucket(begin, end, sink, token).await }
                    })
                    .await;
                debug!("stream finished");
            }
            .in_current_span(),
        );
        Ok(())
    }
}

/// Parses caller-supplied identifiers, rejecting anything that isn't a
/// positive integer.
pub fn parse_ids<S: AsRef<str>>(raw: &[S]) -> Result<Vec<u64>> {
    raw.iter()
        .map(|id| {
            let id = id.as_ref().trim();
            match id.parse::<u64>() {
                Ok(parsed) if parsed > 0 => Ok(parsed),
                _ => Err(DbError::InvalidInput {
                    field: "ids",
                    message: format!("{id:?} is not a valid identifier"),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::db::models::{
        invitations::Invitation, iteration_medias::IterationMedia, oauth2_clients::OAuth2Client,
        recipe_step_events::RecipeStepEvent, recipe_step_ingredients::RecipeStepIngredient,
        recipe_step_instruments::RecipeStepInstrument, recipe_step_products::RecipeStepProduct, recipe_steps::RecipeStep,
        recipes::Recipe,
        reports::Report, required_preparation_instruments::RequiredPreparationInstrument,
        valid_ingredient_preparations::ValidIngredientPreparation, valid_ingredient_tags::ValidIngredientTag,
        valid_ingredients::ValidIngredient, valid_instruments::ValidInstrument, valid_preparations::ValidPreparation,
        webhooks::Webhook,
    };
    use crate::test_utils::{
        SEEDED_PREPARATION_ID, create_test_iteration, create_test_recipe, create_test_step, create_test_user, database,
        database_with, test_recipe, test_step, test_user,
    };
    use sqlx::postgres::PgPoolOptions;
    use std::collections::HashSet;

    fn report(owner: u64, concern: &str) -> Report {
        Report {
            report_type: "abuse".to_string(),
            concern: concern.to_string(),
            belongs_to_user: owner,
        }
    }

    async fn round_trip<E>(store: &EntityStore<E>, chain: E::Chain, input: E) -> Record<E>
    where
        E: Entity + Clone + PartialEq,
    {
        let created = store.create(input.clone()).await.unwrap();
        assert_ne!(created.id, 0, "{}", E::SCHEMA.table);
        assert_ne!(created.created_on, 0, "{}", E::SCHEMA.table);

        let fetched = store.get(chain, created.id).await.unwrap();
        assert_eq!(fetched.data, input, "{}", E::SCHEMA.table);
        assert_eq!(fetched, created, "{}", E::SCHEMA.table);
        assert!(fetched.last_updated_on.is_none());
        assert!(fetched.archived_on.is_none());
        assert!(store.exists(chain, created.id).await.unwrap(), "{}", E::SCHEMA.table);
        fetched
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_create_then_get_recipe(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "grandchild").await;

        let input = Recipe {
            name: "Pancakes".to_string(),
            source: "grandma".to_string(),
            description: "fluffy".to_string(),
            inspired_by_recipe_id: None,
            belongs_to_user: user.id,
        };
        round_trip(&db.recipes, [user.id], input).await;
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_every_entity_round_trips(pool: PgPool) {
        let db = database(pool).await;
        let user = round_trip(&db.users, [], test_user("everything")).await;
        let recipe = round_trip(&db.recipes, [user.id], test_recipe(user.id, "Stock")).await;
        let step = round_trip(
            &db.recipe_steps,
            [recipe.id],
            RecipeStep {
                temperature_in_celsius: Some(180),
                notes: "simmer gently".to_string(),
                ..test_step(recipe.id, 0)
            },
        )
        .await;
        let iteration = create_test_iteration(&db, recipe.id).await;
        round_trip(&db.recipe_iterations, [recipe.id], iteration.data.clone()).await;

        round_trip(
            &db.oauth2_clients,
            [user.id],
            OAuth2Client {
                name: "app".to_string(),
                client_id: "round-trip".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "https://example.com".to_string(),
                scopes: Vec::new(),
                belongs_to_user: user.id,
            },
        )
        .await;
        round_trip(
            &db.webhooks,
            [user.id],
            Webhook {
                name: "hook".to_string(),
                content_type: "application/json".to_string(),
                url: "https://example.com/hook".to_string(),
                method: "POST".to_string(),
                events: vec!["created".to_string()],
                data_types: Vec::new(),
                topics: vec!["recipes".to_string(), "steps".to_string()],
                belongs_to_user: user.id,
            },
        )
        .await;
        round_trip(
            &db.invitations,
            [user.id],
            Invitation {
                code: "ROUNDTRIP".to_string(),
                consumed: false,
                belongs_to_user: user.id,
            },
        )
        .await;
        round_trip(&db.reports, [user.id], report(user.id, "spam")).await;

        let instrument = round_trip(
            &db.valid_instruments,
            [],
            ValidInstrument {
                name: "mandoline".to_string(),
                variant: "round trip".to_string(),
                description: "adjustable slicer".to_string(),
                icon: "mandoline".to_string(),
            },
        )
        .await;
        let ingredient = round_trip(
            &db.valid_ingredients,
            [],
            ValidIngredient {
                name: "sorrel".to_string(),
                variant: "round trip".to_string(),
                contains_dairy: false,
                measurable_by_volume: true,
                warning: "high in oxalic acid".to_string(),
                ..Default::default()
            },
        )
        .await;
        let preparation = round_trip(
            &db.valid_preparations,
            [],
            ValidPreparation {
                name: "chiffonade".to_string(),
                description: "roll and slice into ribbons".to_string(),
                icon: "ribbons".to_string(),
                applicable_to_all_ingredients: false,
            },
        )
        .await;
        round_trip(
            &db.valid_ingredient_tags,
            [],
            ValidIngredientTag {
                name: "leafy".to_string(),
            },
        )
        .await;
        round_trip(
            &db.valid_ingredient_preparations,
            [ingredient.id],
            ValidIngredientPreparation {
                notes: "stack leaves first".to_string(),
                valid_preparation_id: preparation.id,
                valid_ingredient_id: ingredient.id,
                belongs_to_valid_ingredient: ingredient.id,
            },
        )
        .await;
        round_trip(
            &db.required_preparation_instruments,
            [preparation.id],
            RequiredPreparationInstrument {
                instrument_id: instrument.id,
                preparation_id: preparation.id,
                notes: String::new(),
                belongs_to_valid_preparation: preparation.id,
            },
        )
        .await;

        round_trip(
            &db.recipe_step_instruments,
            [recipe.id, step.id],
            RecipeStepInstrument {
                instrument_id: None,
                recipe_step_id: step.id,
                notes: "any large pot".to_string(),
                belongs_to_recipe_step: step.id,
            },
        )
        .await;
        round_trip(
            &db.recipe_step_ingredients,
            [recipe.id, step.id],
            RecipeStepIngredient {
                ingredient_id: Some(ingredient.id),
                quantity_type: "grams".to_string(),
                quantity_value: 12.5,
                quantity_notes: String::new(),
                product_of_recipe: false,
                ingredient_notes: "washed".to_string(),
                belongs_to_recipe_step: step.id,
            },
        )
        .await;
        round_trip(
            &db.recipe_step_products,
            [recipe.id, step.id],
            RecipeStepProduct {
                name: "stock".to_string(),
                recipe_step_id: step.id,
                belongs_to_recipe_step: step.id,
            },
        )
        .await;
        round_trip(
            &db.recipe_step_events,
            [recipe.id, step.id],
            RecipeStepEvent {
                event_type: "started".to_string(),
                done: false,
                recipe_iteration_id: iteration.id,
                recipe_step_id: step.id,
                belongs_to_recipe_step: step.id,
            },
        )
        .await;
        round_trip(
            &db.iteration_medias,
            [recipe.id, iteration.id],
            IterationMedia {
                path: "media/stock.jpg".to_string(),
                mimetype: "image/jpeg".to_string(),
                recipe_iteration_id: iteration.id,
                recipe_step_id: Some(step.id),
                belongs_to_recipe_iteration: iteration.id,
            },
        )
        .await;
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_wrong_owner_looks_missing(pool: PgPool) {
        let db = database(pool).await;
        let owner = create_test_user(&db, "owner").await;
        let other = create_test_user(&db, "other").await;
        let recipe = create_test_recipe(&db, owner.id, "Soup").await;

        assert!(matches!(db.recipes.get([other.id], recipe.id).await, Err(DbError::NotFound)));
        assert!(!db.recipes.exists([other.id], recipe.id).await.unwrap());
        assert!(db.recipes.exists([owner.id], recipe.id).await.unwrap());
        assert!(!db.recipes.exists([owner.id], recipe.id + 1000).await.unwrap());
        assert!(matches!(
            db.recipes.get([owner.id], recipe.id + 1000).await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(db.recipes.archive([other.id], recipe.id).await, Err(DbError::NotFound)));
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_every_link_of_a_nested_chain_is_checked(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "nested").await;
        let recipe = create_test_recipe(&db, user.id, "Bread").await;
        let other_recipe = create_test_recipe(&db, user.id, "Cake").await;
        let step = create_test_step(&db, recipe.id, 0).await;
        let other_step = create_test_step(&db, other_recipe.id, 0).await;
        let product = db
            .recipe_step_products
            .create(RecipeStepProduct {
                name: "dough".to_string(),
                recipe_step_id: step.id,
                belongs_to_recipe_step: step.id,
            })
            .await
            .unwrap();

        let store = &db.recipe_step_products;
        assert!(store.exists([recipe.id, step.id], product.id).await.unwrap());
        for chain in [[other_recipe.id, step.id], [recipe.id, other_step.id], [other_recipe.id, other_step.id]] {
            assert!(!store.exists(chain, product.id).await.unwrap(), "chain {chain:?}");
            assert!(matches!(store.get(chain, product.id).await, Err(DbError::NotFound)), "chain {chain:?}");
            let page = store.list(chain, &QueryFilter::default()).await.unwrap();
            assert!(page.items.is_empty(), "chain {chain:?}");
        }

        let page = store.list([recipe.id, step.id], &QueryFilter::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, product.id);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_list_steps_of_a_recipe(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "lister").await;
        let recipe = create_test_recipe(&db, user.id, "Risotto").await;
        let mut expected = Vec::new();
        for index in 0..3 {
            expected.push(create_test_step(&db, recipe.id, index).await.id);
        }

        let filter = QueryFilter {
            page: Some(1),
            limit: Some(20),
            ..Default::default()
        };
        let page = db.recipe_steps.list([recipe.id], &filter).await.unwrap();
        let ids: Vec<u64> = page.items.iter().map(|s| s.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_list_pagination(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "pager").await;
        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(db.reports.create(report(user.id, &format!("concern {n}"))).await.unwrap().id);
        }

        let first = QueryFilter {
            limit: Some(2),
            ..Default::default()
        };
        let page = db.reports.list([user.id], &first).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 5);

        let third = QueryFilter {
            page: Some(3),
            limit: Some(2),
            ..Default::default()
        };
        let page = db.reports.list([user.id], &third).await.unwrap();
        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[4]]);
        assert!(page.total_count >= page.items.len() as u64);

        let beyond = QueryFilter {
            page: Some(10),
            limit: Some(2),
            ..Default::default()
        };
        let page = db.reports.list([user.id], &beyond).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0, "no rows means no count column was read");
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_list_time_bounds(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "timer").await;
        let report = db.reports.create(report(user.id, "late")).await.unwrap();

        let before = QueryFilter {
            created_before: Some(report.created_on),
            ..Default::default()
        };
        assert!(db.reports.list([user.id], &before).await.unwrap().items.is_empty());

        let after = QueryFilter {
            created_after: Some(report.created_on - 1),
            ..Default::default()
        };
        assert_eq!(db.reports.list([user.id], &after).await.unwrap().items.len(), 1);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_archive_then_archive_again(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "archivist").await;
        let recipe = create_test_recipe(&db, user.id, "Stew").await;
        let keep = create_test_step(&db, recipe.id, 0).await;
        let step = create_test_step(&db, recipe.id, 1).await;

        db.recipe_steps.archive([recipe.id], step.id).await.unwrap();
        assert!(matches!(
            db.recipe_steps.archive([recipe.id], step.id).await,
            Err(DbError::NotFound)
        ));

        let page = db.recipe_steps.list([recipe.id], &QueryFilter::default()).await.unwrap();
        assert_eq!(page.items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![keep.id]);
        assert_eq!(page.total_count, 1);
        assert!(!db.recipe_steps.exists([recipe.id], step.id).await.unwrap());
        assert_eq!(db.recipe_steps.count().await.unwrap(), 1);

        let archived = db.recipe_steps.get([recipe.id], step.id).await.unwrap();
        assert!(archived.archived_on.is_some());
        assert!(archived.last_updated_on.is_some());
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_update_rewrites_fields(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "editor").await;
        let mut recipe = create_test_recipe(&db, user.id, "Draft").await;

        recipe.data.name = "Final".to_string();
        recipe.data.description = "tested twice".to_string();
        db.recipes.update(&mut recipe).await.unwrap();

        let reloaded = db.recipes.get([user.id], recipe.id).await.unwrap();
        assert_eq!(reloaded.data, recipe.data);
        assert_eq!(reloaded.last_updated_on, recipe.last_updated_on);
        assert!(reloaded.last_updated_on.unwrap() >= reloaded.created_on);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_update_cannot_move_or_invent_rows(pool: PgPool) {
        let db = database(pool).await;
        let owner = create_test_user(&db, "keeper").await;
        let thief = create_test_user(&db, "thief").await;
        let recipe = create_test_recipe(&db, owner.id, "Secret").await;

        let mut stolen = recipe.clone();
        stolen.data.belongs_to_user = thief.id;
        stolen.data.name = "Mine now".to_string();
        assert!(matches!(db.recipes.update(&mut stolen).await, Err(DbError::NotFound)));
        assert!(stolen.last_updated_on.is_none());

        let mut missing = recipe.clone();
        missing.id += 1000;
        assert!(matches!(db.recipes.update(&mut missing).await, Err(DbError::NotFound)));

        let unchanged = db.recipes.get([owner.id], recipe.id).await.unwrap();
        assert_eq!(unchanged.data.name, "Secret");
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_missing_parent_is_foreign_key_violation(pool: PgPool) {
        let db = database(pool).await;
        let err = db.recipes.create(test_recipe(4242, "Orphan")).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "got {err:?}");
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_with_ids_keeps_requested_order(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "batcher").await;
        let other = create_test_user(&db, "bystander").await;
        let mut ids = Vec::new();
        for n in 0..4 {
            ids.push(db.reports.create(report(user.id, &format!("r{n}"))).await.unwrap().id);
        }
        let foreign = db.reports.create(report(other.id, "not yours")).await.unwrap();
        db.reports.archive([user.id], ids[1]).await.unwrap();

        let requested = [ids[3], foreign.id, ids[1], ids[0], ids[2], 999_999];
        let found = db.reports.get_with_ids([user.id], 10, &requested).await.unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[3], ids[0], ids[2]]);

        let limited = db.reports.get_with_ids([user.id], 2, &requested).await.unwrap();
        assert_eq!(limited.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[3], ids[0]]);

        assert!(db.reports.get_with_ids([user.id], 10, &[]).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_with_ids_zero_limit_uses_default(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "many").await;
        let mut ids = Vec::new();
        for n in 0..25 {
            ids.push(db.reports.create(report(user.id, &format!("r{n}"))).await.unwrap().id);
        }

        let found = db.reports.get_with_ids([user.id], 0, &ids).await.unwrap();
        assert_eq!(found.len(), usize::from(DEFAULT_LIMIT));
        assert_eq!(found[0].id, ids[0]);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_seeded_taxonomy_is_listable(pool: PgPool) {
        let db = database(pool).await;
        let page = db.valid_preparations.list([], &QueryFilter::default()).await.unwrap();
        assert_eq!(page.total_count, crate::db::migrations::SEEDED_VALID_PREPARATIONS);
        assert!(page.items.iter().any(|p| p.id == SEEDED_PREPARATION_ID));
    }

    async fn collect(db: &Database, cancel: CancellationToken) -> Vec<Record<Recipe>> {
        let (tx, mut rx) = mpsc::channel(64);
        db.recipes.get_all(tx, cancel).await.unwrap();
        let mut records = Vec::new();
        while let Some(batch) = rx.recv().await {
            assert!(!batch.is_empty());
            records.extend(batch);
        }
        records
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_all_returns_before_the_sink_is_drained(pool: PgPool) {
        let settings = RepositorySettings {
            get_all_bucket_size: 1,
            ..Default::default()
        };
        let db = database_with(pool, settings).await;
        let user = create_test_user(&db, "slow reader").await;
        let mut expected = HashSet::new();
        for n in 0..3 {
            expected.insert(create_test_recipe(&db, user.id, &format!("recipe {n}")).await.id);
        }

        let (tx, mut rx) = mpsc::channel(1);
        tokio::time::timeout(Duration::from_secs(5), db.recipes.get_all(tx, CancellationToken::new()))
            .await
            .expect("get_all waited on the receiver")
            .unwrap();

        let mut streamed = HashSet::new();
        while let Some(batch) = rx.recv().await {
            assert_eq!(batch.len(), 1);
            streamed.extend(batch.into_iter().map(|r| r.id));
        }
        assert_eq!(streamed, expected);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_all_stops_when_receiver_dropped(pool: PgPool) {
        let settings = RepositorySettings {
            get_all_bucket_size: 1,
            ..Default::default()
        };
        let db = database_with(pool, settings).await;
        let user = create_test_user(&db, "impatient").await;
        for n in 0..4 {
            create_test_recipe(&db, user.id, &format!("recipe {n}")).await;
        }

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        db.recipes.get_all(tx, CancellationToken::new()).await.unwrap();
        assert_eq!(db.recipes.count().await.unwrap(), 4);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_all_streams_every_live_row(pool: PgPool) {
        let settings = RepositorySettings {
            get_all_bucket_size: 3,
            get_all_workers: 2,
            ..Default::default()
        };
        let db = database_with(pool, settings).await;
        let user = create_test_user(&db, "streamer").await;
        let mut expected = HashSet::new();
        for n in 0..10 {
            expected.insert(create_test_recipe(&db, user.id, &format!("recipe {n}")).await.id);
        }
        let archived = create_test_recipe(&db, user.id, "archived").await;
        db.recipes.archive([user.id], archived.id).await.unwrap();

        let records = collect(&db, CancellationToken::new()).await;
        let streamed: HashSet<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(records.len(), expected.len(), "no row is sent twice");
        assert_eq!(streamed, expected);
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_all_on_empty_table(pool: PgPool) {
        let db = database(pool).await;
        assert!(collect(&db, CancellationToken::new()).await.is_empty());
    }

    #[sqlx::test(migrations = false)]
    #[test_log::test]
    async fn test_get_all_stops_when_cancelled(pool: PgPool) {
        let db = database(pool).await;
        let user = create_test_user(&db, "canceller").await;
        create_test_recipe(&db, user.id, "never sent").await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(collect(&db, cancel).await.is_empty());
    }

    fn unreachable_store(query_timeout: Option<Duration>) -> EntityStore<Report> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://recipedb@127.0.0.1:1/recipedb")
            .unwrap();
        EntityStore::new(
            pool,
            RepositorySettings {
                query_timeout,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_deadline_produces_timeout() {
        let store = unreachable_store(Some(Duration::from_millis(10)));
        let err = store
            .with_deadline("waiting on", std::future::pending::<std::result::Result<(), sqlx::Error>>())
            .await
            .unwrap_err();
        match err {
            DbError::Timeout { operation } => assert_eq!(operation, "waiting on reports"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_statement_is_never_sent() {
        let store = unreachable_store(None);
        let statement = Select::from_table("not a table").build();
        assert!(statement.is_empty());

        let err = store.fetch_all("listing", &statement).await.unwrap_err();
        assert!(err.to_string().contains("empty query"), "got {err}");
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_ids(&["1", " 42 ", "7"]).unwrap(), vec![1, 42, 7]);
        assert!(parse_ids::<&str>(&[]).unwrap().is_empty());
        for bad in ["0", "-3", "abc", ""] {
            let err = parse_ids(&[bad]).unwrap_err();
            assert!(matches!(err, DbError::InvalidInput { field: "ids", .. }), "{bad:?}");
        }
    }
}
