//! Schema discovery.
//!
//! Turns raw catalog rows into merged columns and functions and assembles
//! them into a [`DBInfo`]. Any query or scan failure aborts the whole cycle.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::{DBColumn, DBFuncParam, DBFunction, DBInfo, DBTable, INTERNAL_PREFIX};
use crate::blocklist::matches_block_list;
use crate::catalog::{CatalogSource, ColumnRow, Engine, FunctionRow, TableColumnRow};
use crate::error::{SchemaqlError, SchemaqlResult};

/// Discover a full schema snapshot.
///
/// The server identity query runs concurrently with column and function
/// discovery. If either side fails the other is dropped and no snapshot is
/// built.
pub async fn discover_schema<C, S>(
    source: &C,
    engine: Engine,
    block_list: &[S],
) -> SchemaqlResult<DBInfo>
where
    C: CatalogSource + ?Sized,
    S: AsRef<str> + Sync,
{
    let identity = source.server_identity();
    let facts = async {
        let cols = discover_columns(source.column_rows().await?, block_list);
        let funcs = discover_functions(source.function_rows().await?, block_list);
        Ok::<_, SchemaqlError>((cols, funcs))
    };

    let (id, (cols, funcs)) = tokio::try_join!(identity, facts)?;
    tracing::debug!(
        "Discovered {} columns and {} functions in {}",
        cols.len(),
        funcs.len(),
        id.name
    );

    let di = DBInfo::new(engine, id.version, &id.schema, &id.name, cols, funcs, block_list);
    tracing::info!(
        "Schema '{}' ({} v{}): {} tables, hash {:016x}",
        di.name(),
        engine,
        di.version(),
        di.tables().len(),
        di.hash()
    );
    Ok(di)
}

/// Fetch a single table on demand, without a full discovery cycle.
///
/// The table type is the engine name. A table with no columns does not exist.
pub async fn discover_table<C, S>(
    source: &C,
    engine: Engine,
    schema: &str,
    name: &str,
    block_list: &[S],
) -> SchemaqlResult<DBTable>
where
    C: CatalogSource + ?Sized,
    S: AsRef<str> + Sync,
{
    let rows = source.table_columns(schema, name).await?;
    if rows.is_empty() {
        return Err(SchemaqlError::not_found("table", format!("{}.{}", schema, name)));
    }

    let t = table_from_columns(engine, schema, name, rows, block_list);
    tracing::debug!("Fetched table {} ({} columns)", t.qualified_name(), t.columns.len());
    Ok(t)
}

fn table_from_columns<S: AsRef<str>>(
    engine: Engine,
    schema: &str,
    name: &str,
    rows: Vec<TableColumnRow>,
    block_list: &[S],
) -> DBTable {
    let columns = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let primary = row.column_key == "PRI";
            DBColumn {
                id: i as i32,
                blocked: matches_block_list(&row.name, block_list),
                schema: row.schema,
                table: row.table,
                name: row.name,
                col_type: row.data_type,
                not_null: row.is_nullable.eq_ignore_ascii_case("NO"),
                primary_key: primary,
                unique_key: primary || row.column_key == "UNI",
                ..Default::default()
            }
        })
        .collect();

    let mut t = DBTable::new(schema, name, engine.as_str(), columns);
    t.blocked = matches_block_list(name, block_list);
    t
}

/// Merge column rows into one column per `schema.table.column`.
///
/// Flags are OR-ed across rows, a primary key is always unique, and scalar
/// fields keep the last non-empty value. Columns are returned in order of
/// first appearance with sequential ids.
pub fn discover_columns<S: AsRef<str>>(rows: Vec<ColumnRow>, block_list: &[S]) -> Vec<DBColumn> {
    let mut merged: IndexMap<String, DBColumn> = IndexMap::new();

    for row in rows {
        if row.table.starts_with(INTERNAL_PREFIX) {
            continue;
        }

        let key = format!("{}:{}:{}", row.schema, row.table, row.name);
        let next_id = merged.len() as i32;
        let col = merged.entry(key).or_insert_with(|| DBColumn {
            id: next_id,
            schema: row.schema.clone(),
            table: row.table.clone(),
            name: row.name.clone(),
            blocked: matches_block_list(&row.name, block_list),
            ..Default::default()
        });
        merge_row(col, row);
    }

    merged.into_values().collect()
}

fn merge_row(col: &mut DBColumn, row: ColumnRow) {
    if !row.col_type.is_empty() {
        col.col_type = row.col_type;
    }
    if row.primary_key {
        col.primary_key = true;
        col.unique_key = true;
    }
    col.not_null |= row.not_null;
    col.unique_key |= row.unique_key;
    col.array |= row.is_array;
    col.full_text |= row.full_text;

    if !row.fkey_schema.is_empty() {
        col.fkey_schema = row.fkey_schema;
    }
    if !row.fkey_table.is_empty() {
        col.fkey_table = row.fkey_table;
    }
    if !row.fkey_col.is_empty() {
        col.fkey_col = row.fkey_col;
    }
}

/// Group parameter rows into functions.
///
/// A parameter without a catalog name is named after its 1-based position in
/// the scan of kept rows. The counter runs across all functions and does not
/// advance for rows of blocked functions.
pub fn discover_functions<S: AsRef<str>>(
    rows: Vec<FunctionRow>,
    block_list: &[S],
) -> Vec<DBFunction> {
    let mut funcs: Vec<DBFunction> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut blocked: HashSet<String> = HashSet::new();
    let mut position = 1;

    for row in rows {
        if blocked.contains(&row.function_id) {
            continue;
        }

        let param = DBFuncParam {
            id: row.param_ordinal,
            name: row.param_name.unwrap_or_else(|| position.to_string()),
            param_type: row.param_type,
        };

        match by_id.get(&row.function_id) {
            Some(&i) => funcs[i].params.push(param),
            None => {
                if matches_block_list(&row.function_name, block_list) {
                    tracing::debug!("Skipping blocked function {}", row.function_name);
                    blocked.insert(row.function_id);
                    continue;
                }
                by_id.insert(row.function_id, funcs.len());
                funcs.push(DBFunction {
                    name: row.function_name,
                    params: vec![param],
                });
            }
        }
        position += 1;
    }

    funcs
}
