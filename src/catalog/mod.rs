//! Catalog queriers.
//!
//! Each supported engine exposes the same three statements: server identity,
//! column facts and function facts. The engine is picked once, when the
//! connection is configured, and the matching [`CatalogDialect`] supplies the
//! statement text from then on.

mod mysql;
mod postgres;
pub mod source;

pub use mysql::Mysql;
pub use postgres::Postgres;
pub use source::{CatalogDb, CatalogSource};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{SchemaqlError, SchemaqlResult};

/// Statement text for one database engine.
pub trait CatalogDialect: Send + Sync {
    /// Returns one row: `(version, schema, name)`.
    fn identity_query(&self) -> &'static str;

    /// Returns one row per (column, constraint) pair.
    fn columns_query(&self) -> &'static str;

    /// Returns one row per function parameter, grouped by function id.
    fn functions_query(&self) -> &'static str;

    /// Returns one row per column of a single table. Binds the schema, then
    /// the table name.
    fn table_columns_query(&self) -> &'static str;
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Postgres,
    Mysql,
}

impl Engine {
    pub fn dialect(&self) -> &'static dyn CatalogDialect {
        match self {
            Engine::Postgres => &Postgres,
            Engine::Mysql => &Mysql,
        }
    }

    /// Infer the engine from a connection URL scheme.
    pub fn from_url(url: &str) -> SchemaqlResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| SchemaqlError::Config(format!("Invalid database URL: {}", e)))?;
        parsed.scheme().parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::Mysql => "mysql",
        }
    }
}

impl FromStr for Engine {
    type Err = SchemaqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Engine::Postgres),
            "mysql" | "mariadb" => Ok(Engine::Mysql),
            other => Err(SchemaqlError::Config(format!(
                "Unsupported database engine: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the connected server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerIdentity {
    pub version: i64,
    pub schema: String,
    pub name: String,
}

/// A raw column fact. One column can appear in several rows, once for every
/// constraint it takes part in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub col_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique_key: bool,
    pub is_array: bool,
    pub full_text: bool,
    pub fkey_schema: String,
    pub fkey_table: String,
    pub fkey_col: String,
}

/// A raw function parameter fact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionRow {
    pub function_name: String,
    pub function_id: String,
    pub param_type: String,
    pub param_name: Option<String>,
    pub param_ordinal: i64,
}

/// A column of a single table, as `information_schema.columns` reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableColumnRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub ordinal: i64,
    /// `YES` or `NO`
    pub is_nullable: String,
    pub data_type: String,
    /// `PRI`, `UNI` or empty
    pub column_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_url() {
        assert_eq!(
            Engine::from_url("postgres://localhost/app").unwrap(),
            Engine::Postgres
        );
        assert_eq!(
            Engine::from_url("postgresql://u:p@db:5432/app").unwrap(),
            Engine::Postgres
        );
        assert_eq!(Engine::from_url("mariadb://db/app").unwrap(), Engine::Mysql);
        assert!(Engine::from_url("sqlite::memory:").is_err());
        assert!(Engine::from_url("not a url").is_err());
    }

    #[test]
    fn test_dialect_statements_differ() {
        let pg = Engine::Postgres.dialect();
        let my = Engine::Mysql.dialect();
        assert_ne!(pg.identity_query(), my.identity_query());
        assert_ne!(pg.columns_query(), my.columns_query());
        assert!(pg.functions_query().contains("ORDER BY"));
        assert!(my.functions_query().contains("ORDER BY"));
        assert!(pg.table_columns_query().contains("$2"));
        assert!(my.table_columns_query().contains("COLUMN_KEY"));
    }

    #[test]
    fn test_mysql_function_ids_are_schema_scoped() {
        let q = Engine::Mysql.dialect().functions_query();
        assert!(q.contains("CONCAT(r.routine_schema, '.', r.specific_name) AS func_id"));
        assert!(q.contains("ORDER BY r.routine_schema, r.specific_name"));
    }

    #[test]
    fn test_engine_serde() {
        let e: Engine = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(e, Engine::Mysql);
        assert_eq!(serde_json::to_string(&Engine::Postgres).unwrap(), "\"postgres\"");
    }
}
