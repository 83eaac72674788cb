//! Default payload flattener.

use serde_json::Value;

use super::{ColumnMap, Flattened, JsonFlattener};
use crate::error::{SchemaqlError, SchemaqlResult};

/// Reads the top-level keys of an object, or the union of keys of an array of
/// objects. Nested values are kept whole; the database populates them.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTree;

impl JsonFlattener for JsonTree {
    fn flatten(&self, value: &Value) -> SchemaqlResult<Flattened> {
        match value {
            Value::Object(map) => Ok(Flattened {
                columns: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                is_batch: false,
            }),
            Value::Array(items) => {
                let mut columns = ColumnMap::new();
                for (i, item) in items.iter().enumerate() {
                    let Value::Object(map) = item else {
                        return Err(SchemaqlError::Payload(format!(
                            "row {} is {}, expected an object",
                            i,
                            kind(item)
                        )));
                    };
                    for (k, v) in map {
                        columns.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                Ok(Flattened {
                    columns,
                    is_batch: true,
                })
            }
            other => Err(SchemaqlError::Payload(format!(
                "expected an object or an array of objects, got {}",
                kind(other)
            ))),
        }
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object() {
        let flat = JsonTree.flatten(&json!({"a": 1, "b": {"c": 2}})).unwrap();
        assert!(!flat.is_batch);
        assert_eq!(flat.columns.len(), 2);
        assert_eq!(flat.columns["b"], json!({"c": 2}));
    }

    #[test]
    fn test_array_unions_keys() {
        let flat = JsonTree
            .flatten(&json!([{"a": 1}, {"b": 2}, {"a": 3}]))
            .unwrap();
        assert!(flat.is_batch);
        assert_eq!(flat.columns.len(), 2);
        assert_eq!(flat.columns["a"], json!(1));
    }

    #[test]
    fn test_rejects_scalars() {
        let err = JsonTree.flatten(&json!("x")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid payload: expected an object or an array of objects, got a string"
        );
        assert!(JsonTree.flatten(&json!([{"a": 1}, 2])).is_err());
    }
}
