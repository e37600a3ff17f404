//! Fixtures shared by the database tests.

use sqlx::PgPool;

use crate::Database;
use crate::db::handlers::{Repository, RepositorySettings};
use crate::db::models::Record;
use crate::db::models::recipe_iterations::RecipeIteration;
use crate::db::models::recipe_steps::RecipeStep;
use crate::db::models::recipes::Recipe;
use crate::db::models::users::User;

/// Seeded preparation used by step fixtures.
pub const SEEDED_PREPARATION_ID: u64 = 1;

/// A migrated database over the test pool.
pub async fn database(pool: PgPool) -> Database {
    database_with(pool, RepositorySettings::default()).await
}

pub async fn database_with(pool: PgPool, settings: RepositorySettings) -> Database {
    let db = Database::new(pool, settings);
    db.migrate(false).await.expect("Failed to migrate test database");
    db
}

pub fn test_user(username: &str) -> User {
    User {
        username: username.to_string(),
        hashed_password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        salt: b"salt".to_vec(),
        password_last_changed_on: None,
        requires_password_change: false,
        two_factor_secret: "JBSWY3DPEHPK3PXP".to_string(),
        two_factor_secret_verified_on: None,
        is_admin: false,
    }
}

pub async fn create_test_user(db: &Database, username: &str) -> Record<User> {
    db.users.create(test_user(username)).await.expect("Failed to create test user")
}

pub fn test_recipe(owner: u64, name: &str) -> Recipe {
    Recipe {
        name: name.to_string(),
        source: "family".to_string(),
        description: format!("{name}, as made at home"),
        inspired_by_recipe_id: None,
        belongs_to_user: owner,
    }
}

pub async fn create_test_recipe(db: &Database, owner: u64, name: &str) -> Record<Recipe> {
    db.recipes
        .create(test_recipe(owner, name))
        .await
        .expect("Failed to create test recipe")
}

pub fn test_step(recipe: u64, index: u32) -> RecipeStep {
    RecipeStep {
        index,
        preparation_id: SEEDED_PREPARATION_ID,
        prerequisite_step: 0,
        min_estimated_time_in_seconds: 60,
        max_estimated_time_in_seconds: 120,
        temperature_in_celsius: None,
        notes: String::new(),
        recipe_id: recipe,
        belongs_to_recipe: recipe,
    }
}

pub async fn create_test_step(db: &Database, recipe: u64, index: u32) -> Record<RecipeStep> {
    db.recipe_steps
        .create(test_step(recipe, index))
        .await
        .expect("Failed to create test recipe step")
}

pub async fn create_test_iteration(db: &Database, recipe: u64) -> Record<RecipeIteration> {
    db.recipe_iterations
        .create(RecipeIteration {
            recipe_id: recipe,
            end_difficulty_rating: 2.0,
            end_complexity_rating: 3.0,
            end_taste_rating: 4.5,
            end_overall_rating: 4.0,
            belongs_to_recipe: recipe,
        })
        .await
        .expect("Failed to create test recipe iteration")
}
