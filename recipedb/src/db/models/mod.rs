//! Database record models matching table schemas.
//!
//! Each model holds the entity-specific columns of one table. The shared
//! envelope (`id` and the three audit timestamps) lives on [`Record`], so a
//! model value is exactly what a caller supplies on create and what an
//! update rewrites.
//!
//! # Model Categories
//!
//! ## Accounts
//!
//! - [`users`]: user accounts and their two-factor secrets
//! - [`oauth2_clients`]: OAuth2 client registrations owned by a user
//! - [`webhooks`]: outbound webhook subscriptions owned by a user
//! - [`invitations`]: invitation codes issued by a user
//! - [`reports`]: user-submitted reports
//!
//! ## Taxonomy
//!
//! - [`valid_instruments`], [`valid_ingredients`], [`valid_preparations`],
//!   [`valid_ingredient_tags`]: shared reference data, seeded by migration
//! - [`valid_ingredient_preparations`]: preparations that apply to an ingredient
//! - [`required_preparation_instruments`]: instruments a preparation needs
//!
//! ## Recipes
//!
//! - [`recipes`], [`recipe_steps`] and the per-step [`recipe_step_ingredients`],
//!   [`recipe_step_instruments`], [`recipe_step_products`]
//! - [`recipe_iterations`], [`recipe_step_events`], [`iteration_medias`]: records
//!   of actually cooking a recipe

use std::fmt::Debug;

use serde::Serialize;

use crate::db::errors::{DbError, Result};
use crate::db::scan::RowScanner;
use crate::db::schema::{Parent, TableSchema};
use crate::db::sql::SqlValue;

pub mod invitations;
pub mod iteration_medias;
pub mod oauth2_clients;
pub mod recipe_iterations;
pub mod recipe_step_events;
pub mod recipe_step_ingredients;
pub mod recipe_step_instruments;
pub mod recipe_step_products;
pub mod recipe_steps;
pub mod recipes;
pub mod reports;
pub mod required_preparation_instruments;
pub mod users;
pub mod valid_ingredient_preparations;
pub mod valid_ingredient_tags;
pub mod valid_ingredients;
pub mod valid_instruments;
pub mod valid_preparations;
pub mod webhooks;

pub(crate) const OWNED_BY_USER: Parent = Parent {
    table: "users",
    foreign_key: "belongs_to_user",
};

pub(crate) const OWNED_BY_RECIPE: Parent = Parent {
    table: "recipes",
    foreign_key: "belongs_to_recipe",
};

pub(crate) const OWNED_BY_RECIPE_STEP: Parent = Parent {
    table: "recipe_steps",
    foreign_key: "belongs_to_recipe_step",
};

pub(crate) const OWNED_BY_RECIPE_ITERATION: Parent = Parent {
    table: "recipe_iterations",
    foreign_key: "belongs_to_recipe_iteration",
};

pub(crate) const OWNED_BY_VALID_INGREDIENT: Parent = Parent {
    table: "valid_ingredients",
    foreign_key: "belongs_to_valid_ingredient",
};

pub(crate) const OWNED_BY_VALID_PREPARATION: Parent = Parent {
    table: "valid_preparations",
    foreign_key: "belongs_to_valid_preparation",
};

/// A persisted entity: the shared envelope around the entity's own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record<E> {
    pub id: u64,
    pub created_on: u64,
    pub last_updated_on: Option<u64>,
    pub archived_on: Option<u64>,
    #[serde(flatten)]
    pub data: E,
}

/// A table-backed entity.
///
/// `scan` and `values` must both follow the order of `SCHEMA.columns`.
pub trait Entity: Debug + Send + Sync + Sized + 'static {
    /// Identifiers of the entity's ancestors, root first.
    type Chain: AsRef<[u64]> + Copy + Default + Debug + Send + Sync + 'static;

    const SCHEMA: &'static TableSchema;

    fn scan(scanner: &mut RowScanner<'_>) -> std::result::Result<Self, sqlx::Error>;

    fn values(&self) -> Vec<SqlValue>;

    /// Identifier of the direct parent, for entities that have one.
    fn owner(&self) -> Option<u64> {
        None
    }

    /// Rejects values that cannot be stored faithfully.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Multi-valued text columns are stored comma-joined without escaping, so
/// elements may neither contain a comma nor be empty.
pub(crate) fn validate_list(field: &'static str, items: &[String]) -> Result<()> {
    if let Some(item) = items.iter().find(|item| item.is_empty() || item.contains(',')) {
        return Err(DbError::InvalidInput {
            field,
            message: format!("list entry {item:?} must be non-empty and must not contain a comma"),
        });
    }
    Ok(())
}
