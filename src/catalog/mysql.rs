//! MySQL / MariaDB catalog statements.

use super::CatalogDialect;

pub struct Mysql;

impl CatalogDialect for Mysql {
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

// 8.0.32-log -> 80032
const IDENTITY: &str = r#"
SELECT
    CAST(
        SUBSTRING_INDEX(VERSION(), '.', 1) * 10000
        + SUBSTRING_INDEX(SUBSTRING_INDEX(VERSION(), '.', 2), '.', -1) * 100
        + CAST(SUBSTRING_INDEX(SUBSTRING_INDEX(SUBSTRING_INDEX(VERSION(), '-', 1), '.', 3), '.', -1) AS UNSIGNED)
    AS SIGNED) AS db_version,
    DATABASE() AS db_schema,
    DATABASE() AS db_name
"#;

const COLUMNS: &str = r#"
SELECT
    col.table_schema AS `schema`,
    col.table_name AS `table`,
    col.column_name AS `column`,
    col.data_type AS `type`,
    CAST(col.is_nullable = 'NO' AS SIGNED) AS not_null,
    CAST(COALESCE(tc.constraint_type = 'PRIMARY KEY', 0) AS SIGNED) AS primary_key,
    CAST(COALESCE(tc.constraint_type = 'UNIQUE', 0) AS SIGNED) AS unique_key,
    CAST(0 AS SIGNED) AS is_array,
    CAST(EXISTS (
        SELECT 1 FROM information_schema.statistics s
        WHERE s.table_schema = col.table_schema
          AND s.table_name = col.table_name
          AND s.column_name = col.column_name
          AND s.index_type = 'FULLTEXT') AS SIGNED) AS full_text,
    COALESCE(kcu.referenced_table_schema, '') AS fkey_schema,
    COALESCE(kcu.referenced_table_name, '') AS fkey_table,
    COALESCE(kcu.referenced_column_name, '') AS fkey_col
FROM information_schema.columns col
LEFT JOIN information_schema.key_column_usage kcu
    ON kcu.table_schema = col.table_schema
   AND kcu.table_name = col.table_name
   AND kcu.column_name = col.column_name
LEFT JOIN information_schema.table_constraints tc
    ON tc.constraint_schema = kcu.constraint_schema
   AND tc.constraint_name = kcu.constraint_name
   AND tc.table_name = kcu.table_name
WHERE col.table_schema NOT IN ('information_schema', 'performance_schema', 'mysql', 'sys')
ORDER BY col.table_schema, col.table_name, col.ordinal_position
"#;

const FUNCTIONS: &str = r#"
SELECT
    r.routine_name AS func_name,
    CONCAT(r.routine_schema, '.', r.specific_name) AS func_id,
    p.data_type AS data_type,
    p.parameter_name AS param_name,
    CAST(p.ordinal_position AS SIGNED) AS param_id
FROM information_schema.routines r
JOIN information_schema.parameters p
    ON r.specific_name = p.specific_name
   AND r.routine_schema = p.specific_schema
WHERE p.specific_schema NOT IN ('information_schema', 'performance_schema', 'mysql', 'sys')
  AND r.routine_type = 'FUNCTION'
  AND p.parameter_mode = 'IN'
ORDER BY r.routine_schema, r.specific_name, p.ordinal_position
"#;

const TABLE_COLUMNS: &str = r#"
SELECT
    TABLE_SCHEMA AS `schema`,
    TABLE_NAME AS `table`,
    COLUMN_NAME AS `column`,
    CAST(ORDINAL_POSITION AS SIGNED) AS ordinal,
    IS_NULLABLE AS is_nullable,
    DATA_TYPE AS data_type,
    COLUMN_KEY AS column_key
FROM information_schema.columns
WHERE TABLE_SCHEMA = ?
  AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION
"#;
