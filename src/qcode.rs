//! Structured query representation.
//!
//! This is the shape produced by the upstream query-language parser and read
//! by the compiler. It deserialises from JSON so queries can also be fed in
//! from files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed query: one or more selections, the first being the root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QCode {
    #[serde(default)]
    pub selects: Vec<Select>,
}

impl QCode {
    pub fn new(root: Select) -> Self {
        Self {
            selects: vec![root],
        }
    }

    pub fn root(&self) -> Option<&Select> {
        self.selects.first()
    }
}

/// Declared action of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Query,
    Insert,
    Update,
    Upsert,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Query => "query",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Upsert => "upsert",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub desc: bool,
}

/// One selection of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub table: String,
    /// Defaults to the snapshot's schema.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub action: Action,
    /// Name of the bound variable holding the mutation payload.
    #[serde(default)]
    pub action_var: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, rename = "where")]
    pub filter: Option<Exp>,
    #[serde(default)]
    pub paging: Paging,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub distinct_on: Vec<String>,
    #[serde(default)]
    pub args: BTreeMap<String, serde_json::Value>,
}

impl Select {
    pub fn query(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn insert(table: &str, var: &str) -> Self {
        Self {
            action: Action::Insert,
            action_var: var.to_string(),
            ..Self::query(table)
        }
    }

    pub fn update(table: &str, var: &str) -> Self {
        Self {
            action: Action::Update,
            action_var: var.to_string(),
            ..Self::query(table)
        }
    }

    pub fn delete(table: &str) -> Self {
        Self {
            action: Action::Delete,
            ..Self::query(table)
        }
    }

    pub fn in_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn filter(mut self, exp: Exp) -> Self {
        self.filter = Some(exp);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.paging.limit = Some(n);
        self
    }

    pub fn order_by(mut self, column: &str, desc: bool) -> Self {
        self.order_by.push(OrderBy {
            column: column.to_string(),
            desc,
        });
        self
    }

    /// Drop paging, ordering, distinct-on, filter and args. Used once a
    /// mutation has been rendered and the selection only wraps its result.
    pub fn clear_read_state(&mut self) {
        self.paging = Paging::default();
        self.order_by.clear();
        self.distinct_on.clear();
        self.filter = None;
        self.args.clear();
    }
}

/// Filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exp {
    And(Vec<Exp>),
    Or(Vec<Exp>),
    Not(Box<Exp>),
    Compare {
        column: String,
        op: CmpOp,
        value: Operand,
    },
    IsNull {
        column: String,
        #[serde(default)]
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Operand>,
        #[serde(default)]
        negated: bool,
    },
}

impl Exp {
    pub fn compare(column: &str, op: CmpOp, value: impl Into<Operand>) -> Self {
        Exp::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, CmpOp::Eq, value)
    }

    pub fn is_null(column: &str) -> Self {
        Exp::IsNull {
            column: column.to_string(),
            negated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    #[serde(rename = "ilike")]
    ILike,
}

impl CmpOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Like => "LIKE",
            CmpOp::ILike => "ILIKE",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Deferred variable, rendered as a `{{name}}` placeholder.
    Var(String),
    Value(serde_json::Value),
}

impl Operand {
    pub fn var(name: &str) -> Self {
        Operand::Var(name.to_string())
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Value(v.into())
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Value(v.into())
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Value(v.into())
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Value(v.into())
    }
}
