//! Error types for schemaql.

use thiserror::Error;

/// The main error type for discovery and compilation.
#[derive(Debug, Error)]
pub enum SchemaqlError {
    /// A catalog query or row scan failed. Fatal to the discovery cycle.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Table or column lookup miss on a snapshot.
    #[error("{kind}: '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The query carried no root selection.
    #[error("empty query")]
    EmptyQuery,

    /// Root action is not insert, update or delete.
    #[error("Unsupported operation: '{0}'. Valid mutations are insert, update and delete")]
    UnsupportedOperation(String),

    /// The action variable is missing from the bound set.
    #[error("Variable '{0}' not defined")]
    UndefinedVariable(String),

    /// Mutation target is absent from the snapshot.
    #[error("Table not found: '{0}'")]
    TableNotFound(String),

    /// Filter references an unknown column or table.
    #[error("Predicate error: {0}")]
    Predicate(String),

    /// The bound payload could not be flattened into columns.
    #[error("Invalid payload: {0}")]
    Payload(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaqlError {
    /// Create a not-found error for a qualified identifier.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a discovery error from anything displayable.
    pub fn discovery(err: impl std::fmt::Display) -> Self {
        Self::Discovery(err.to_string())
    }
}

/// Result type alias for schemaql operations.
pub type SchemaqlResult<T> = Result<T, SchemaqlError>;
