//! # recipedb: Relational Persistence for Recipe Authoring
//!
//! `recipedb` stores the data of a recipe-authoring service in PostgreSQL: user accounts and
//! their credentials, a shared taxonomy of valid instruments, ingredients and preparations, and
//! user-owned recipes broken down into steps, step ingredients, instruments, products and the
//! iterations recorded while actually cooking.
//!
//! ## Overview
//!
//! Every table shares one shape: a `BIGSERIAL` id, the entity's own columns, and three audit
//! timestamps (`created_on`, `last_updated_on`, `archived_on`) in whole Unix seconds assigned by
//! the database clock. Rows are never deleted; archiving stamps `archived_on` and hides the row from
//! lists, existence checks and streaming while leaving it readable by id.
//!
//! Most entities sit under a parent. A recipe step ingredient belongs to a recipe step, which
//! belongs to a recipe, which belongs to a user. Callers address an entity through its ownership
//! chain, the identifiers of its ancestors from the root down, and every read joins up that chain.
//! A row that exists but sits under a different chain is indistinguishable from a missing row.
//!
//! ## Architecture
//!
//! The **SQL layer** ([`db::sql`]) builds parameterised statements. Builders accept `?`
//! placeholders and render PostgreSQL's numbered `$n` form, keeping arguments in render order.
//!
//! The **repository layer** ([`db::handlers`]) implements the shared operation set once, in
//! [`EntityStore`](db::handlers::EntityStore), driven by each entity's
//! [`TableSchema`](db::schema::TableSchema). The handler modules add the handful of lookups that
//! only make sense for one table, such as finding a user by username.
//!
//! The **migration layer** ([`db::migrations`]) creates the schema, seeds the taxonomy and,
//! for local development, an administrator account. [`Database::migrate`] applies it at most once
//! per handle.
//!
//! ## Getting started
//!
//! ```ignore
//! use recipedb::{Database, config::{Args, Config}};
//! use recipedb::db::{filter::QueryFilter, handlers::Repository};
//!
//! let config = Config::load(&Args { config: "config.yaml".into(), validate: false, dev_user: false })?;
//! let db = Database::connect(&config).await?;
//! db.migrate(config.migrations.create_dev_user).await?;
//!
//! let instruments = db.valid_instruments.list([], &QueryFilter::default()).await?;
//! println!("{} instruments", instruments.total_count);
//! ```
//!
//! ## Configuration
//!
//! See [`config`] for the YAML layout and the `RECIPEDB_` environment overrides.

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::Config;
use crate::db::errors::{DbError, Result};
use crate::db::handlers::{
    EntityStore, Invitations, IterationMedias, OAuth2Clients, RecipeIterations, RecipeStepEvents, RecipeStepIngredients,
    RecipeStepInstruments, RecipeStepProducts, RecipeSteps, Recipes, Reports, RepositorySettings,
    RequiredPreparationInstruments, Users, ValidIngredientPreparations, ValidIngredientTags, ValidIngredients,
    ValidInstruments, ValidPreparations, Webhooks,
};
use crate::db::migrations::MigrationGuard;

pub mod config;
pub mod db;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_utils;

/// A connection pool plus one repository per table.
pub struct Database {
    pool: PgPool,
    migrations: MigrationGuard,

    pub users: Users,
    pub oauth2_clients: OAuth2Clients,
    pub webhooks: Webhooks,
    pub invitations: Invitations,
    pub reports: Reports,

    pub valid_instruments: ValidInstruments,
    pub valid_ingredients: ValidIngredients,
    pub valid_preparations: ValidPreparations,
    pub valid_ingredient_tags: ValidIngredientTags,
    pub valid_ingredient_preparations: ValidIngredientPreparations,
    pub required_preparation_instruments: RequiredPreparationInstruments,

    pub recipes: Recipes,
    pub recipe_steps: RecipeSteps,
    pub recipe_step_instruments: RecipeStepInstruments,
    pub recipe_step_ingredients: RecipeStepIngredients,
    pub recipe_step_products: RecipeStepProducts,
    pub recipe_iterations: RecipeIterations,
    pub recipe_step_events: RecipeStepEvents,
    pub iteration_medias: IterationMedias,
}

impl Database {
    /// Wrap an existing pool. Nothing touches the database until first use.
    pub fn new(pool: PgPool, settings: RepositorySettings) -> Self {
        Self {
            users: EntityStore::new(pool.clone(), settings.clone()),
            oauth2_clients: EntityStore::new(pool.clone(), settings.clone()),
            webhooks: EntityStore::new(pool.clone(), settings.clone()),
            invitations: EntityStore::new(pool.clone(), settings.clone()),
            reports: EntityStore::new(pool.clone(), settings.clone()),
            valid_instruments: EntityStore::new(pool.clone(), settings.clone()),
            valid_ingredients: EntityStore::new(pool.clone(), settings.clone()),
            valid_preparations: EntityStore::new(pool.clone(), settings.clone()),
            valid_ingredient_tags: EntityStore::new(pool.clone(), settings.clone()),
            valid_ingredient_preparations: EntityStore::new(pool.clone(), settings.clone()),
            required_preparation_instruments: EntityStore::new(pool.clone(), settings.clone()),
            recipes: EntityStore::new(pool.clone(), settings.clone()),
            recipe_steps: EntityStore::new(pool.clone(), settings.clone()),
            recipe_step_instruments: EntityStore::new(pool.clone(), settings.clone()),
            recipe_step_ingredients: EntityStore::new(pool.clone(), settings.clone()),
            recipe_step_products: EntityStore::new(pool.clone(), settings.clone()),
            recipe_iterations: EntityStore::new(pool.clone(), settings.clone()),
            recipe_step_events: EntityStore::new(pool.clone(), settings.clone()),
            iteration_medias: EntityStore::new(pool.clone(), settings.clone()),
            migrations: MigrationGuard::new(),
            pool,
        }
    }

    /// Open a pool from configuration. Connections are established lazily,
    /// so an unreachable database surfaces on [`Database::migrate`] as
    /// [`DbError::NotReady`].
    #[instrument(skip(config), err)]
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = config
            .database
            .pool
            .options()
            .connect_lazy(&config.database.url)
            .map_err(|source| DbError::NotReady { source })?;
        info!(max_connections = config.database.pool.max_connections, "database pool created");
        Ok(Self::new(pool, config.repositories.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations. Only the first successful call per handle
    /// does any work; the guard is scoped to this handle, not the process.
    /// Migrating through another handle on the same database is safe and
    /// applies no version twice.
    pub async fn migrate(&self, create_dev_user: bool) -> Result<()> {
        self.migrations.migrate(&self.pool, create_dev_user).await
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
