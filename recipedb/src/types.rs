//! Common type definitions.
//!
//! Every entity is identified by a database-assigned `BIGSERIAL`, exposed as
//! `u64`. The aliases below name which table an identifier points into and
//! document intent at call sites; they do not prevent mixing.
//!
//! Timestamps are whole seconds since the Unix epoch, assigned by the
//! database clock.

pub type UserId = u64;
pub type RecipeId = u64;
pub type RecipeStepId = u64;
pub type RecipeIterationId = u64;
pub type ValidInstrumentId = u64;
pub type ValidIngredientId = u64;
pub type ValidPreparationId = u64;

/// Seconds since the Unix epoch.
pub type UnixTime = u64;
