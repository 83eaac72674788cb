//! PostgreSQL catalog statements.

use super::CatalogDialect;

pub struct Postgres;

impl CatalogDialect for Postgres {
    fn identity_query(&self) -> &'static str {
        IDENTITY
    }

    fn columns_query(&self) -> &'static str {
        COLUMNS
    }

    fn functions_query(&self) -> &'static str {
        FUNCTIONS
    }

    fn table_columns_query(&self) -> &'static str {
        TABLE_COLUMNS
    }
}

const IDENTITY: &str = r#"
SELECT
    current_setting('server_version_num')::int8 AS db_version,
    current_schema()::text AS db_schema,
    current_database()::text AS db_name
"#;

const COLUMNS: &str = r#"
SELECT
    n.nspname::text AS "schema",
    c.relname::text AS "table",
    f.attname::text AS "column",
    pg_catalog.format_type(f.atttypid, f.atttypmod)::text AS "type",
    (CASE WHEN f.attnotnull THEN 1 ELSE 0 END)::int8 AS not_null,
    (CASE WHEN co.contype = 'p' THEN 1 ELSE 0 END)::int8 AS primary_key,
    (CASE WHEN co.contype = 'u' THEN 1 ELSE 0 END)::int8 AS unique_key,
    (CASE WHEN f.attndims <> 0 OR t.typcategory = 'A' THEN 1 ELSE 0 END)::int8 AS is_array,
    (CASE WHEN t.typname = 'tsvector' THEN 1 ELSE 0 END)::int8 AS full_text,
    COALESCE(CASE WHEN co.contype = 'f' THEN (
        SELECT n2.nspname::text
        FROM pg_catalog.pg_class c2
        JOIN pg_catalog.pg_namespace n2 ON n2.oid = c2.relnamespace
        WHERE c2.oid = co.confrelid) END, '') AS fkey_schema,
    COALESCE(CASE WHEN co.contype = 'f' THEN (
        SELECT c2.relname::text
        FROM pg_catalog.pg_class c2
        WHERE c2.oid = co.confrelid) END, '') AS fkey_table,
    COALESCE(CASE WHEN co.contype = 'f' THEN (
        SELECT a2.attname::text
        FROM pg_catalog.pg_attribute a2
        WHERE a2.attrelid = co.confrelid
          AND a2.attnum = co.confkey[array_position(co.conkey, f.attnum)]) END, '') AS fkey_col
FROM pg_catalog.pg_attribute f
JOIN pg_catalog.pg_class c ON c.oid = f.attrelid
JOIN pg_catalog.pg_type t ON t.oid = f.atttypid
LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_catalog.pg_constraint co ON co.conrelid = c.oid AND f.attnum = ANY (co.conkey)
WHERE c.relkind IN ('r', 'v', 'm', 'f', 'p')
  AND n.nspname NOT IN ('information_schema', 'pg_catalog')
  AND n.nspname NOT LIKE 'pg_toast%'
  AND f.attnum > 0
  AND f.attisdropped = false
ORDER BY n.nspname, c.relname, f.attnum
"#;

const FUNCTIONS: &str = r#"
SELECT
    r.routine_name::text AS func_name,
    r.specific_name::text AS func_id,
    p.data_type::text AS data_type,
    p.parameter_name::text AS param_name,
    p.ordinal_position::int8 AS param_id
FROM information_schema.routines r
JOIN information_schema.parameters p
    ON r.specific_name = p.specific_name
   AND r.specific_schema = p.specific_schema
WHERE p.specific_schema NOT IN ('information_schema', 'pg_catalog')
  AND r.routine_type = 'FUNCTION'
  AND p.parameter_mode = 'IN'
ORDER BY r.specific_name, p.ordinal_position
"#;

const TABLE_COLUMNS: &str = r#"
SELECT
    col.table_schema::text AS "schema",
    col.table_name::text AS "table",
    col.column_name::text AS "column",
    col.ordinal_position::int8 AS ordinal,
    col.is_nullable::text AS is_nullable,
    col.data_type::text AS data_type,
    (CASE
        WHEN EXISTS (
            SELECT 1
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON kcu.constraint_schema = tc.constraint_schema
               AND kcu.constraint_name = tc.constraint_name
            WHERE tc.table_schema = col.table_schema
              AND tc.table_name = col.table_name
              AND kcu.column_name = col.column_name
              AND tc.constraint_type = 'PRIMARY KEY') THEN 'PRI'
        WHEN EXISTS (
            SELECT 1
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON kcu.constraint_schema = tc.constraint_schema
               AND kcu.constraint_name = tc.constraint_name
            WHERE tc.table_schema = col.table_schema
              AND tc.table_name = col.table_name
              AND kcu.column_name = col.column_name
              AND tc.constraint_type = 'UNIQUE') THEN 'UNI'
        ELSE ''
    END)::text AS column_key
FROM information_schema.columns col
WHERE col.table_schema = $1
  AND col.table_name = $2
ORDER BY col.ordinal_position
"#;
