//! # schemaql
//!
//! Schema discovery and mutation compilation for SQL databases.
//!
//! schemaql reads a live database catalog into an immutable, hashed
//! [`schema::DBInfo`] snapshot, then uses that snapshot to turn insert,
//! update and delete requests carrying a JSON payload into single SQL
//! statements.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use schemaql::prelude::*;
//! use std::sync::Arc;
//!
//! let db = CatalogDb::connect("postgres://localhost/app", Engine::Postgres, 5).await?;
//! let info = discover_schema(&db, Engine::Postgres, &["secret_.*"]).await?;
//!
//! let mut qc = QCode::new(Select::insert("users", "data"));
//! let mut vars = Variables::new();
//! vars.insert("data".into(), serde_json::json!({"email": "a@b.c"}));
//!
//! let mut w = SqlBuilder::new();
//! Compiler::new(Arc::new(info)).compile_mutation(&mut qc, &mut w, &vars)?;
//! // => WITH "users" AS (WITH "input" AS (SELECT {{data}}::json AS j) INSERT INTO users (email) ...
//! ```

pub mod blocklist;
pub mod catalog;
pub mod config;
pub mod error;
pub mod qcode;
pub mod registry;
pub mod schema;
pub mod transpiler;

pub mod prelude {
    pub use crate::blocklist::matches_block_list;
    pub use crate::catalog::{CatalogDb, CatalogSource, Engine};
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::qcode::*;
    pub use crate::registry::SchemaRegistry;
    pub use crate::schema::{DBColumn, DBFunction, DBInfo, DBTable, discover_schema, discover_table};
    pub use crate::transpiler::{Compiler, MutationPlan, SelectCompiler, SqlBuilder, Variables};
}
