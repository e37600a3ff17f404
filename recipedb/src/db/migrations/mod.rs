//! Schema migration registry and runner.
//!
//! # Responsibility
//! - Register schema and seed migrations in a fixed order.
//! - Apply pending migrations through `sqlx::migrate`, which records applied
//!   versions and holds an advisory lock while it runs.
//! - Optionally seed an administrative development user.
//!
//! # Invariants
//! - Versions are assigned from registration order and never reused; new
//!   migrations are only ever appended.
//! - The registry is immutable. The development-user migration is added to a
//!   per-call copy under a reserved version, so requesting it never shifts
//!   any other version.
//! - [`MigrationGuard`] runs the migrations at most once per database handle.

use std::borrow::Cow;

use anyhow::anyhow;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use futures::future::BoxFuture;
use sqlx::error::BoxDynError;
use sqlx::migrate::{Migration, MigrationSource, MigrationType, Migrator};
use sqlx::{Connection, PgPool};
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::db::errors::{DbError, Result};

#[derive(Debug, Clone, Copy)]
struct Script {
    description: &'static str,
    sql: &'static str,
}

const SCHEMA: &[Script] = &[
    Script {
        description: "create users table",
        sql: include_str!("0001_users.sql"),
    },
    Script {
        description: "create sessions table",
        sql: include_str!("0002_sessions.sql"),
    },
    Script {
        description: "create oauth2 clients table",
        sql: include_str!("0003_oauth2_clients.sql"),
    },
    Script {
        description: "create webhooks table",
        sql: include_str!("0004_webhooks.sql"),
    },
    Script {
        description: "create valid instruments table",
        sql: include_str!("0005_valid_instruments.sql"),
    },
    Script {
        description: "create valid ingredients table",
        sql: include_str!("0006_valid_ingredients.sql"),
    },
    Script {
        description: "create valid preparations table",
        sql: include_str!("0007_valid_preparations.sql"),
    },
    Script {
        description: "create valid ingredient preparations table",
        sql: include_str!("0008_valid_ingredient_preparations.sql"),
    },
    Script {
        description: "create required preparation instruments table",
        sql: include_str!("0009_required_preparation_instruments.sql"),
    },
    Script {
        description: "create recipes table",
        sql: include_str!("0010_recipes.sql"),
    },
    Script {
        description: "create recipe steps table",
        sql: include_str!("0011_recipe_steps.sql"),
    },
    Script {
        description: "create recipe step instruments table",
        sql: include_str!("0012_recipe_step_instruments.sql"),
    },
    Script {
        description: "create recipe step ingredients table",
        sql: include_str!("0013_recipe_step_ingredients.sql"),
    },
    Script {
        description: "create recipe step products table",
        sql: include_str!("0014_recipe_step_products.sql"),
    },
    Script {
        description: "create recipe iterations table",
        sql: include_str!("0015_recipe_iterations.sql"),
    },
    Script {
        description: "create recipe step events table",
        sql: include_str!("0016_recipe_step_events.sql"),
    },
    Script {
        description: "create iteration medias table",
        sql: include_str!("0017_iteration_medias.sql"),
    },
    Script {
        description: "create invitations table",
        sql: include_str!("0018_invitations.sql"),
    },
    Script {
        description: "create reports table",
        sql: include_str!("0019_reports.sql"),
    },
    Script {
        description: "create valid ingredient tags table",
        sql: include_str!("0020_valid_ingredient_tags.sql"),
    },
];

const SEEDS: &[Script] = &[
    Script {
        description: "seed valid instruments",
        sql: include_str!("0021_seed_valid_instruments.sql"),
    },
    Script {
        description: "seed valid ingredients",
        sql: include_str!("0022_seed_valid_ingredients.sql"),
    },
    Script {
        description: "seed valid preparations",
        sql: include_str!("0023_seed_valid_preparations.sql"),
    },
    Script {
        description: "seed valid ingredient tags",
        sql: include_str!("0024_seed_valid_ingredient_tags.sql"),
    },
];

/// Rows inserted by the seed migrations.
pub const SEEDED_VALID_INSTRUMENTS: u64 = 12;
pub const SEEDED_VALID_INGREDIENTS: u64 = 15;
pub const SEEDED_VALID_PREPARATIONS: u64 = 10;
pub const SEEDED_VALID_INGREDIENT_TAGS: u64 = 6;

/// Reserved version for the development-user seed, far above any schema version.
pub const DEV_USER_VERSION: i64 = 1_000_000;
pub const DEV_USERNAME: &str = "username";
pub const DEV_PASSWORD: &str = "password";
/// Base32 TOTP secret of the development user.
pub const DEV_TWO_FACTOR_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

/// Fixed salt so the dev-user script, and therefore its checksum, is identical on every run.
const DEV_USER_SALT: &[u8] = b"recipedb-dev-user";

/// Highest schema or seed version known to this build.
pub fn latest_version() -> i64 {
    (SCHEMA.len() + SEEDS.len()) as i64
}

/// Every migration to apply, in order.
pub fn migrations(create_dev_user: bool) -> Result<Vec<Migration>> {
    let mut migrations: Vec<Migration> = SCHEMA
        .iter()
        .chain(SEEDS)
        .zip(1i64..)
        .map(|(script, version)| simple_migration(version, script.description, Cow::Borrowed(script.sql)))
        .collect();

    if create_dev_user {
        migrations.push(simple_migration(
            DEV_USER_VERSION,
            "create development user",
            Cow::Owned(dev_user_script()?),
        ));
    }
    Ok(migrations)
}

fn simple_migration(version: i64, description: &'static str, sql: Cow<'static, str>) -> Migration {
    Migration::new(version, Cow::Borrowed(description), MigrationType::Simple, sql, false)
}

fn dev_user_script() -> Result<String> {
    let params = Params::new(19456, 2, 1, None).map_err(|e| anyhow!("create argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::encode_b64(DEV_USER_SALT).map_err(|e| anyhow!("encode dev user salt: {e}"))?;
    let hashed_password = argon2
        .hash_password(DEV_PASSWORD.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash dev user password: {e}"))?
        .to_string();
    let salt_hex: String = DEV_USER_SALT.iter().map(|byte| format!("{byte:02x}")).collect();

    Ok(format!(
        "INSERT INTO users (username, hashed_password, salt, two_factor_secret, two_factor_secret_verified_on, is_admin) \
         VALUES ('{DEV_USERNAME}', '{hashed_password}', decode('{salt_hex}', 'hex'), '{DEV_TWO_FACTOR_SECRET}', \
         extract(epoch FROM NOW()), true);"
    ))
}

/// Hands a prepared migration list to `sqlx::migrate::Migrator`.
#[derive(Debug)]
struct MigrationList(Vec<Migration>);

impl<'s> MigrationSource<'s> for MigrationList {
    fn resolve(self) -> BoxFuture<'s, std::result::Result<Vec<Migration>, BoxDynError>> {
        Box::pin(async move { Ok(self.0) })
    }
}

/// Probes the database, then applies every pending migration.
#[instrument(skip(pool), err)]
pub async fn run(pool: &PgPool, create_dev_user: bool) -> Result<()> {
    let mut conn = pool.acquire().await.map_err(|source| DbError::NotReady { source })?;
    conn.ping().await.map_err(|source| DbError::NotReady { source })?;
    drop(conn);

    let mut migrator = Migrator::new(MigrationList(migrations(create_dev_user)?)).await?;
    // A database once seeded with the dev user must still migrate without it.
    migrator.set_ignore_missing(true);
    migrator.run(pool).await?;

    info!(version = latest_version(), create_dev_user, "database migrated");
    Ok(())
}

/// Runs migrations at most once for the lifetime of the guard.
///
/// The scope is the guard, not the process: each [`Database`](crate::Database)
/// owns one, so a process normally holds a single handle and migrates once.
/// A second handle runs the migrator again, which applies nothing because
/// versions already recorded in `_sqlx_migrations` are skipped.
///
/// Concurrent callers wait for the first run to finish. A run that fails
/// leaves the guard unset so startup can retry once the database is ready.
#[derive(Debug, Default)]
pub struct MigrationGuard {
    applied_with_dev_user: OnceCell<bool>,
}

impl MigrationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn migrate(&self, pool: &PgPool, create_dev_user: bool) -> Result<()> {
        let applied_with_dev_user = self
            .applied_with_dev_user
            .get_or_try_init(|| async { run(pool, create_dev_user).await.map(|()| create_dev_user) })
            .await?;

        if *applied_with_dev_user != create_dev_user {
            warn!(
                requested = create_dev_user,
                applied = *applied_with_dev_user,
                "migrations already ran with a different dev user setting; ignoring"
            );
        }
        Ok(())
    }

    pub fn has_run(&self) -> bool {
        self.applied_with_dev_user.initialized()
    }
}
