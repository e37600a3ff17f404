//! Repository implementations for database access.
//!
//! Every entity table gets an [`EntityStore`], which implements the shared
//! [`Repository`] operations. The aliases below name each store; a few tables
//! add lookups of their own in the modules of the same name.
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts, with lookups by username and password / 2FA updates
//! - [`OAuth2Clients`]: client registrations, with lookup by client id
//! - [`Webhooks`]: webhook subscriptions, with an unowned listing
//! - [`Invitations`]: invitation codes, with lookup by code
//! - The taxonomy and recipe stores, which use only the shared operations
//!
//! # Common Pattern
//!
//! ```ignore
//! use recipedb::db::handlers::Repository;
//! use recipedb::db::filter::QueryFilter;
//!
//! async fn example(db: &recipedb::Database, user_id: u64) -> recipedb::db::errors::Result<()> {
//!     // Recipes are owned by users, so the chain is just the user id
//!     let page = db.recipes.list([user_id], &QueryFilter::default()).await?;
//!     for recipe in page.items {
//!         db.recipes.archive([user_id], recipe.id).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod invitations;
pub mod oauth2_clients;
pub mod repository;
pub mod users;
pub mod webhooks;

pub use repository::{EntityStore, Repository, RepositorySettings, parse_ids};

use crate::db::models::{
    invitations::Invitation, iteration_medias::IterationMedia, oauth2_clients::OAuth2Client,
    recipe_iterations::RecipeIteration, recipe_step_events::RecipeStepEvent, recipe_step_ingredients::RecipeStepIngredient,
    recipe_step_instruments::RecipeStepInstrument, recipe_step_products::RecipeStepProduct, recipe_steps::RecipeStep,
    recipes::Recipe, reports::Report, required_preparation_instruments::RequiredPreparationInstrument, users::User,
    valid_ingredient_preparations::ValidIngredientPreparation, valid_ingredient_tags::ValidIngredientTag,
    valid_ingredients::ValidIngredient, valid_instruments::ValidInstrument, valid_preparations::ValidPreparation,
    webhooks::Webhook,
};

pub type Users = EntityStore<User>;
pub type OAuth2Clients = EntityStore<OAuth2Client>;
pub type Webhooks = EntityStore<Webhook>;
pub type Invitations = EntityStore<Invitation>;
pub type Reports = EntityStore<Report>;
pub type ValidInstruments = EntityStore<ValidInstrument>;
pub type ValidIngredients = EntityStore<ValidIngredient>;
pub type ValidPreparations = EntityStore<ValidPreparation>;
pub type ValidIngredientTags = EntityStore<ValidIngredientTag>;
pub type ValidIngredientPreparations = EntityStore<ValidIngredientPreparation>;
pub type RequiredPreparationInstruments = EntityStore<RequiredPreparationInstrument>;
pub type Recipes = EntityStore<Recipe>;
pub type RecipeSteps = EntityStore<RecipeStep>;
pub type RecipeStepInstruments = EntityStore<RecipeStepInstrument>;
pub type RecipeStepIngredients = EntityStore<RecipeStepIngredient>;
pub type RecipeStepProducts = EntityStore<RecipeStepProduct>;
pub type RecipeIterations = EntityStore<RecipeIteration>;
pub type RecipeStepEvents = EntityStore<RecipeStepEvent>;
pub type IterationMedias = EntityStore<IterationMedia>;
