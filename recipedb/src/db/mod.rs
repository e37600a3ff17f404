//! Database layer: statement building, repositories and migrations.
//!
//! - [`sql`]: parameterised statement builders rendering PostgreSQL placeholders
//! - [`schema`]: table descriptions and ownership-chain constraints
//! - [`scan`]: positional row decoding
//! - [`filter`]: list pagination and time bounds
//! - [`models`]: one type per table
//! - [`handlers`]: the repositories
//! - [`migrations`]: schema, seeds and the migration runner
//! - [`errors`]: the error type every operation returns

pub mod errors;
pub mod filter;
pub mod handlers;
pub mod migrations;
pub mod models;
pub mod scan;
pub mod schema;
pub mod sql;
