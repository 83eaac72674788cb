use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Mutex;

use schemaql::catalog::{
    CatalogSource, ColumnRow, Engine, FunctionRow, ServerIdentity, TableColumnRow,
};
use schemaql::error::{SchemaqlError, SchemaqlResult};
use schemaql::registry::SchemaRegistry;
use schemaql::schema::{discover_schema, discover_table};

/// Catalog rows held in memory.
#[derive(Default)]
struct MemoryCatalog {
    columns: Vec<ColumnRow>,
    functions: Vec<FunctionRow>,
    fail_identity: bool,
    fail_columns: Mutex<bool>,
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn server_identity(&self) -> SchemaqlResult<ServerIdentity> {
        if self.fail_identity {
            return Err(SchemaqlError::Discovery("identity query failed".into()));
        }
        Ok(ServerIdentity {
            version: 160002,
            schema: "public".into(),
            name: "shop".into(),
        })
    }

    async fn column_rows(&self) -> SchemaqlResult<Vec<ColumnRow>> {
        if *self.fail_columns.lock().unwrap() {
            return Err(SchemaqlError::Discovery("error fetching columns".into()));
        }
        Ok(self.columns.clone())
    }

    async fn function_rows(&self) -> SchemaqlResult<Vec<FunctionRow>> {
        Ok(self.functions.clone())
    }

    // Derived from the column rows, the way information_schema reports them.
    async fn table_columns(&self, schema: &str, table: &str) -> SchemaqlResult<Vec<TableColumnRow>> {
        if *self.fail_columns.lock().unwrap() {
            return Err(SchemaqlError::Discovery(format!("error fetching table {}.{}", schema, table)));
        }

        let mut out: Vec<TableColumnRow> = Vec::new();
        for r in self.columns.iter().filter(|r| r.schema == schema && r.table == table) {
            let key = if r.primary_key {
                "PRI"
            } else if r.unique_key {
                "UNI"
            } else {
                ""
            };
            match out.iter_mut().find(|c| c.name == r.name) {
                Some(c) => {
                    if c.column_key.is_empty() {
                        c.column_key = key.into();
                    }
                }
                None => out.push(TableColumnRow {
                    schema: r.schema.clone(),
                    table: r.table.clone(),
                    name: r.name.clone(),
                    ordinal: out.len() as i64 + 1,
                    is_nullable: if r.not_null || r.primary_key { "NO" } else { "YES" }.into(),
                    data_type: r.col_type.clone(),
                    column_key: key.into(),
                }),
            }
        }
        Ok(out)
    }
}

fn col(table: &str, name: &str, col_type: &str) -> ColumnRow {
    ColumnRow {
        schema: "public".into(),
        table: table.into(),
        name: name.into(),
        col_type: col_type.into(),
        ..Default::default()
    }
}

fn shop_columns() -> Vec<ColumnRow> {
    vec![
        ColumnRow {
            primary_key: true,
            not_null: true,
            ..col("customers", "id", "bigint")
        },
        col("customers", "email", "text"),
        col("customers", "password_hash", "text"),
        ColumnRow {
            primary_key: true,
            ..col("orders", "id", "bigint")
        },
        // customer_id shows up once per constraint
        ColumnRow {
            not_null: true,
            ..col("orders", "customer_id", "bigint")
        },
        ColumnRow {
            fkey_schema: "public".into(),
            fkey_table: "customers".into(),
            fkey_col: "id".into(),
            ..col("orders", "customer_id", "")
        },
        ColumnRow {
            is_array: true,
            ..col("orders", "tags", "text[]")
        },
        col("_sq_migrations", "version", "bigint"),
    ]
}

fn shop_functions() -> Vec<FunctionRow> {
    vec![
        FunctionRow {
            function_name: "order_total".into(),
            function_id: "order_total_16410".into(),
            param_type: "bigint".into(),
            param_name: None,
            param_ordinal: 1,
        },
        FunctionRow {
            function_name: "internal_rehash".into(),
            function_id: "internal_rehash_16500".into(),
            param_type: "text".into(),
            param_name: Some("pw".into()),
            param_ordinal: 1,
        },
    ]
}

fn shop() -> MemoryCatalog {
    MemoryCatalog {
        columns: shop_columns(),
        functions: shop_functions(),
        ..Default::default()
    }
}

const BLOCKS: [&str; 2] = ["password_.*", "internal_.*"];

#[tokio::test]
async fn test_discover_assembles_snapshot() {
    let di = discover_schema(&shop(), Engine::Postgres, &BLOCKS).await.unwrap();

    assert_eq!(di.version(), 160002);
    assert_eq!(di.name(), "shop");
    assert_eq!(di.tables().len(), 2);
    assert!(di.get_table("public", "_sq_migrations").is_err());

    let customer_id = di.get_column("public", "orders", "customer_id").unwrap();
    assert_eq!(customer_id.col_type, "bigint");
    assert!(customer_id.not_null);
    assert_eq!(customer_id.fkey_table, "customers");
    assert_eq!(customer_id.fkey_col, "id");

    let id = di.get_column("public", "orders", "id").unwrap();
    assert!(id.primary_key && id.unique_key);

    assert!(di.get_column("public", "orders", "tags").unwrap().array);
    assert!(di.get_column("public", "customers", "password_hash").unwrap().blocked);

    let orders = di.get_table("public", "orders").unwrap();
    let names: Vec<&str> = orders.column_names().collect();
    assert_eq!(names, vec!["id", "customer_id", "tags"]);
    assert_eq!(orders.primary_col.as_ref().unwrap().name, "id");

    assert_eq!(di.functions().len(), 1);
    let f = di.get_function("order_total").unwrap();
    assert_eq!(f.params[0].name, "1");
    assert!(di.get_function("internal_rehash").is_none());
}

#[tokio::test]
async fn test_hash_is_independent_of_row_order() {
    let a = discover_schema(&shop(), Engine::Postgres, &BLOCKS).await.unwrap();

    let mut reordered = shop();
    reordered.columns.reverse();
    let b = discover_schema(&reordered, Engine::Postgres, &BLOCKS).await.unwrap();

    assert_eq!(a.hash(), b.hash());
}

#[tokio::test]
async fn test_identity_failure_is_fatal() {
    let source = MemoryCatalog {
        fail_identity: true,
        ..shop()
    };
    let err = discover_schema(&source, Engine::Postgres, &BLOCKS).await.unwrap_err();
    assert!(matches!(err, SchemaqlError::Discovery(_)));
}

#[tokio::test]
async fn test_column_failure_is_fatal() {
    let source = shop();
    *source.fail_columns.lock().unwrap() = true;
    let err = discover_schema(&source, Engine::Postgres, &BLOCKS).await.unwrap_err();
    assert_eq!(err.to_string(), "Discovery error: error fetching columns");
}

#[tokio::test]
async fn test_registry_refresh() {
    let source = shop();
    let registry = SchemaRegistry::load(&source, Engine::Postgres, &BLOCKS).await.unwrap();
    let first = registry.snapshot().await;

    // same catalog, same hash
    assert!(!registry.refresh(&source, Engine::Postgres, &BLOCKS).await.unwrap());

    // a failed refresh keeps the published snapshot
    *source.fail_columns.lock().unwrap() = true;
    assert!(registry.refresh(&source, Engine::Postgres, &BLOCKS).await.is_err());
    assert_eq!(registry.snapshot().await.hash(), first.hash());

    // a changed catalog publishes a new snapshot
    let mut changed = shop();
    changed.columns.push(col("orders", "note", "text"));
    assert!(registry.refresh(&changed, Engine::Postgres, &BLOCKS).await.unwrap());
    assert!(registry.snapshot().await.get_column("public", "orders", "note").is_ok());
    assert!(first.get_column("public", "orders", "note").is_err());
}

#[tokio::test]
async fn test_discover_single_table() {
    let t = discover_table(&shop(), Engine::Postgres, "public", "customers", &BLOCKS)
        .await
        .unwrap();

    assert_eq!(t.qualified_name(), "public.customers");
    assert_eq!(t.table_type, "postgres");
    assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["id", "email", "password_hash"]);

    let id = t.get_column("ID").unwrap();
    assert!(id.primary_key && id.unique_key && id.not_null);
    assert_eq!(t.primary_col.as_ref().unwrap().name, "id");
    assert!(!t.get_column("email").unwrap().not_null);
    assert!(t.get_column("password_hash").unwrap().blocked);
}

#[tokio::test]
async fn test_discover_single_table_missing() {
    let err = discover_table(&shop(), Engine::Postgres, "public", "refunds", &BLOCKS)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "table: 'public.refunds' not found");

    let source = shop();
    *source.fail_columns.lock().unwrap() = true;
    let err = discover_table(&source, Engine::Postgres, "public", "orders", &BLOCKS)
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaqlError::Discovery(_)));
}
