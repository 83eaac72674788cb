//! Schema snapshot.
//!
//! A [`DBInfo`] is built once per discovery cycle and never changes after
//! that. Tables and columns keep discovery order, lookups go through hash
//! indices built at construction, and a content hash identifies the shape of
//! the schema independently of that order.
//!
//! # Example
//! ```
//! use schemaql::catalog::Engine;
//! use schemaql::schema::{DBColumn, DBInfo};
//!
//! let cols = vec![
//!     DBColumn::new("public", "users", "id", "bigint").primary(),
//!     DBColumn::new("public", "users", "email", "text"),
//! ];
//! let no_blocks: [&str; 0] = [];
//! let di = DBInfo::new(Engine::Postgres, 160000, "public", "app", cols, vec![], &no_blocks);
//!
//! assert_eq!(di.get_table("public", "users").unwrap().columns.len(), 2);
//! assert!(di.get_column("public", "users", "EMAIL").is_ok());
//! ```

pub mod discover;
mod hash;

pub use discover::{discover_columns, discover_functions, discover_schema, discover_table};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::blocklist::matches_block_list;
use crate::catalog::Engine;
use crate::error::{SchemaqlError, SchemaqlResult};

/// Tables whose name starts with this prefix belong to schemaql itself and
/// are never exposed.
pub const INTERNAL_PREFIX: &str = "_sq_";

/// A discovered column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DBColumn {
    pub id: i32,
    pub schema: String,
    pub table: String,
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique_key: bool,
    #[serde(default)]
    pub full_text: bool,
    #[serde(default)]
    pub fkey_schema: String,
    #[serde(default)]
    pub fkey_table: String,
    #[serde(default)]
    pub fkey_col: String,
    #[serde(default)]
    pub blocked: bool,
}

impl DBColumn {
    pub fn new(schema: &str, table: &str, name: &str, col_type: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            name: name.to_string(),
            col_type: col_type.to_string(),
            ..Default::default()
        }
    }

    /// Builder: mark as primary key (implies unique and not null).
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.unique_key = true;
        self.not_null = true;
        self
    }

    /// Builder: point a foreign key at `schema.table.column`.
    pub fn references(mut self, schema: &str, table: &str, column: &str) -> Self {
        self.fkey_schema = schema.to_string();
        self.fkey_table = table.to_string();
        self.fkey_col = column.to_string();
        self
    }

    pub fn has_foreign_key(&self) -> bool {
        !self.fkey_table.is_empty()
    }

    /// `schema.table.column`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.name)
    }
}

/// A table and its columns, in discovery order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DBTable {
    pub schema: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub table_type: String,
    pub columns: Vec<DBColumn>,
    pub primary_col: Option<DBColumn>,
    /// Reserved; discovery never sets it.
    #[serde(default)]
    pub secondary_col: Option<DBColumn>,
    #[serde(default)]
    pub full_text: Vec<DBColumn>,
    #[serde(default)]
    pub blocked: bool,
    #[serde(skip)]
    col_map: HashMap<String, usize>,
}

impl DBTable {
    /// Build a table, classifying its columns in one pass.
    ///
    /// When several columns are flagged primary the last one wins. A
    /// full-text column is never taken as the primary column.
    pub fn new(schema: &str, name: &str, table_type: &str, columns: Vec<DBColumn>) -> Self {
        let mut t = Self {
            schema: schema.to_string(),
            name: name.to_string(),
            table_type: table_type.to_string(),
            columns,
            ..Default::default()
        };

        for c in &t.columns {
            if c.full_text {
                t.full_text.push(c.clone());
            } else if c.primary_key {
                t.primary_col = Some(c.clone());
            }
        }
        t.reindex();
        t
    }

    fn reindex(&mut self) {
        self.col_map = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.to_lowercase(), i))
            .collect();
    }

    /// Case-insensitive column lookup.
    pub fn get_column(&self, name: &str) -> Option<&DBColumn> {
        self.col_map
            .get(&name.to_lowercase())
            .map(|&i| &self.columns[i])
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A database function and its input parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DBFunction {
    pub name: String,
    pub params: Vec<DBFuncParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DBFuncParam {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

/// Reserved for polymorphic relations. Discovery never fills these in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTable {
    pub name: String,
    pub id_column: String,
    pub type_column: String,
    pub fkey_column: String,
}

/// Immutable schema snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DBInfo {
    engine: Engine,
    version: i64,
    schema: String,
    name: String,
    tables: Vec<DBTable>,
    functions: Vec<DBFunction>,
    #[serde(default)]
    virtual_tables: Vec<VirtualTable>,
    #[serde(skip)]
    col_map: HashMap<String, (usize, usize)>,
    #[serde(skip)]
    table_map: HashMap<String, usize>,
    #[serde(skip)]
    hash: u64,
}

impl DBInfo {
    /// Assemble a snapshot from merged columns and functions.
    ///
    /// Columns are grouped into tables in order of first appearance. Tables
    /// with the internal prefix are dropped and tables matching the
    /// block-list are kept but flagged.
    pub fn new<S: AsRef<str>>(
        engine: Engine,
        version: i64,
        schema: &str,
        name: &str,
        columns: Vec<DBColumn>,
        functions: Vec<DBFunction>,
        block_list: &[S],
    ) -> Self {
        let mut di = Self {
            engine,
            version,
            schema: schema.to_string(),
            name: name.to_string(),
            tables: Vec::new(),
            functions,
            virtual_tables: Vec::new(),
            col_map: HashMap::new(),
            table_map: HashMap::new(),
            hash: 0,
        };

        let mut groups: indexmap::IndexMap<(String, String), Vec<DBColumn>> =
            indexmap::IndexMap::new();
        for c in columns {
            groups
                .entry((c.schema.clone(), c.table.clone()))
                .or_default()
                .push(c);
        }

        for ((schema, table), cols) in groups {
            if table.starts_with(INTERNAL_PREFIX) {
                continue;
            }
            let mut t = DBTable::new(&schema, &table, "", cols);
            t.blocked = matches_block_list(&t.name, block_list);
            di.add_table(t);
        }

        di.hash = hash::snapshot_hash(&di);
        di
    }

    fn add_table(&mut self, t: DBTable) {
        let ti = self.tables.len();
        for (ci, c) in t.columns.iter().enumerate() {
            self.col_map
                .insert(column_key(&c.schema, &c.table, &c.name), (ti, ci));
        }
        self.table_map.insert(table_key(&t.schema, &t.name), ti);
        self.tables.push(t);
    }

    /// Load a snapshot written by [`DBInfo::to_json`]. Indices and the hash
    /// are rebuilt.
    pub fn from_json(json: &str) -> SchemaqlResult<Self> {
        let mut di: DBInfo = serde_json::from_str(json)
            .map_err(|e| SchemaqlError::Config(format!("Invalid schema snapshot: {}", e)))?;

        let tables = std::mem::take(&mut di.tables);
        for mut t in tables {
            t.reindex();
            di.add_table(t);
        }
        di.hash = hash::snapshot_hash(&di);
        Ok(di)
    }

    pub fn to_json(&self) -> SchemaqlResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SchemaqlError::Config(format!("Failed to serialize snapshot: {}", e)))
    }

    pub fn get_table(&self, schema: &str, table: &str) -> SchemaqlResult<&DBTable> {
        self.table_map
            .get(&table_key(schema, table))
            .map(|&i| &self.tables[i])
            .ok_or_else(|| SchemaqlError::not_found("table", format!("{}.{}", schema, table)))
    }

    /// Exact qualified match first, then a case-insensitive match within the
    /// table.
    pub fn get_column(&self, schema: &str, table: &str, column: &str) -> SchemaqlResult<&DBColumn> {
        if let Some(&(ti, ci)) = self.col_map.get(&column_key(schema, table, column)) {
            return Ok(&self.tables[ti].columns[ci]);
        }

        self.get_table(schema, table)?
            .get_column(column)
            .ok_or_else(|| {
                SchemaqlError::not_found("column", format!("{}.{}.{}", schema, table, column))
            })
    }

    pub fn get_function(&self, name: &str) -> Option<&DBFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Content digest, stable across discovery order.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Default schema of the connection.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[DBTable] {
        &self.tables
    }

    pub fn functions(&self) -> &[DBFunction] {
        &self.functions
    }

    pub fn virtual_tables(&self) -> &[VirtualTable] {
        &self.virtual_tables
    }
}

fn table_key(schema: &str, table: &str) -> String {
    format!("{}:{}", schema, table)
}

fn column_key(schema: &str, table: &str, column: &str) -> String {
    format!("{}:{}:{}", schema, table, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_BLOCKS: [&str; 0] = [];

    fn sample_columns() -> Vec<DBColumn> {
        vec![
            DBColumn::new("public", "users", "id", "bigint").primary(),
            DBColumn::new("public", "users", "Email", "text"),
            DBColumn::new("public", "posts", "id", "bigint").primary(),
            DBColumn::new("public", "posts", "user_id", "bigint")
                .references("public", "users", "id"),
            DBColumn {
                full_text: true,
                ..DBColumn::new("public", "posts", "search", "tsvector")
            },
            DBColumn::new("public", "_sq_meta", "k", "text"),
        ]
    }

    fn sample() -> DBInfo {
        DBInfo::new(
            Engine::Postgres,
            150000,
            "public",
            "app",
            sample_columns(),
            vec![],
            &["secrets", "posts"],
        )
    }

    #[test]
    fn test_tables_in_discovery_order() {
        let di = sample();
        let names: Vec<&str> = di.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);
    }

    #[test]
    fn test_internal_tables_skipped() {
        let di = sample();
        let err = di.get_table("public", "_sq_meta").unwrap_err();
        assert_eq!(err.to_string(), "table: 'public._sq_meta' not found");
    }

    #[test]
    fn test_get_table_not_found_names_identifier() {
        let di = sample();
        let err = di.get_table("sales", "orders").unwrap_err();
        assert!(matches!(err, SchemaqlError::NotFound { kind: "table", .. }));
        assert_eq!(err.to_string(), "table: 'sales.orders' not found");
    }

    #[test]
    fn test_get_column() {
        let di = sample();
        let c = di.get_column("public", "posts", "user_id").unwrap();
        assert_eq!(c.fkey_table, "users");
        assert!(c.has_foreign_key());

        // case-insensitive inside the table
        assert_eq!(di.get_column("public", "users", "email").unwrap().name, "Email");
        assert_eq!(di.get_column("public", "users", "EMAIL").unwrap().name, "Email");

        let err = di.get_column("public", "users", "phone").unwrap_err();
        assert_eq!(err.to_string(), "column: 'public.users.phone' not found");

        let err = di.get_column("public", "nope", "id").unwrap_err();
        assert_eq!(err.to_string(), "table: 'public.nope' not found");
    }

    #[test]
    fn test_table_classification() {
        let di = sample();
        let posts = di.get_table("public", "posts").unwrap();
        assert_eq!(posts.primary_col.as_ref().unwrap().name, "id");
        assert_eq!(posts.full_text.len(), 1);
        assert_eq!(posts.full_text[0].name, "search");
        assert!(posts.secondary_col.is_none());
        assert!(posts.blocked);

        let users = di.get_table("public", "users").unwrap();
        assert!(!users.blocked);
        assert!(users.full_text.is_empty());
    }

    #[test]
    fn test_last_primary_wins() {
        let t = DBTable::new(
            "public",
            "pairs",
            "",
            vec![
                DBColumn::new("public", "pairs", "a", "int").primary(),
                DBColumn::new("public", "pairs", "b", "int").primary(),
            ],
        );
        assert_eq!(t.primary_col.unwrap().name, "b");
    }

    #[test]
    fn test_full_text_column_is_not_primary() {
        let t = DBTable::new(
            "public",
            "docs",
            "",
            vec![
                DBColumn::new("public", "docs", "id", "bigint").primary(),
                DBColumn {
                    full_text: true,
                    ..DBColumn::new("public", "docs", "body", "tsvector").primary()
                },
            ],
        );
        assert_eq!(t.primary_col.unwrap().name, "id");
        assert_eq!(t.full_text.len(), 1);
        assert_eq!(t.full_text[0].name, "body");
    }

    #[test]
    fn test_reserved_fields_empty() {
        let di = sample();
        assert!(di.virtual_tables().is_empty());
    }

    #[test]
    fn test_json_roundtrip_keeps_lookups_and_hash() {
        let di = sample();
        let json = di.to_json().unwrap();
        let loaded = DBInfo::from_json(&json).unwrap();

        assert_eq!(loaded.hash(), di.hash());
        assert_eq!(loaded.engine(), Engine::Postgres);
        assert_eq!(loaded.version(), 150000);
        assert!(loaded.get_column("public", "users", "EMAIL").is_ok());
        assert!(loaded.get_table("public", "posts").unwrap().blocked);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            DBInfo::from_json("{\"tables\": 3}"),
            Err(SchemaqlError::Config(_))
        ));
    }

    #[test]
    fn test_empty_snapshot() {
        let di = DBInfo::new(Engine::Mysql, 80032, "app", "app", vec![], vec![], &NO_BLOCKS);
        assert!(di.tables().is_empty());
        assert_eq!(di.schema(), "app");
        assert_eq!(di.name(), "app");
    }
}
