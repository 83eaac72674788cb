//! Mutation compiler.
//!
//! Renders the root selection of a [`QCode`] as a single SQL statement that
//! runs an insert, update or delete inside a common table expression named
//! after the target table. The JSON payload is never inlined: it stays a
//! `{{var}}` placeholder that a later stage binds.
//!
//! Compilation is two-phase. [`Compiler::compile_mutation`] writes the
//! mutation CTE and leaves the statement open; a [`SelectCompiler`] then
//! appends the read that returns the affected rows.
//!
//! ```text
//! WITH "users" AS (WITH "input" AS (SELECT {{data}}::json AS j)
//!   INSERT INTO users (id, email) SELECT id, email
//!   FROM input i, json_populate_record(NULL::users, i.j) t RETURNING *)
//! ```

mod delete;
pub mod filter;
mod insert;
pub mod json;
mod update;

pub use filter::FilterRenderer;
pub use json::JsonTree;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{SchemaqlError, SchemaqlResult};
use crate::qcode::{Action, Exp, QCode, Select};
use crate::schema::{DBInfo, DBTable};

/// Bound variables, by name.
pub type Variables = HashMap<String, serde_json::Value>;

/// Column name to value mapping of a payload.
pub type ColumnMap = HashMap<String, serde_json::Value>;

/// A flattened payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub columns: ColumnMap,
    /// True when the payload holds many rows.
    pub is_batch: bool,
}

/// Turns a bound JSON value into a column map.
pub trait JsonFlattener: Send + Sync {
    fn flatten(&self, value: &serde_json::Value) -> SchemaqlResult<Flattened>;
}

/// Renders a filter tree as a predicate against `table`.
pub trait WhereRenderer: Send + Sync {
    fn render(&self, filter: &Exp, table: &DBTable) -> SchemaqlResult<String>;
}

/// Closes a statement left open by [`Compiler::compile_mutation`].
pub trait SelectCompiler {
    fn compile_query(&self, qc: &QCode, w: &mut SqlBuilder) -> SchemaqlResult<()>;
}

/// SQL text buffer owned by the caller of a compilation.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    buf: String,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self
    }

    /// Write `"ident"`.
    pub fn quoted(&mut self, ident: &str) -> &mut Self {
        self.buf.push('"');
        self.buf.push_str(ident);
        self.buf.push('"');
        self
    }

    /// Write a deferred `{{name}}` placeholder.
    pub fn placeholder(&mut self, name: &str) -> &mut Self {
        self.buf.push_str("{{");
        self.buf.push_str(name);
        self.buf.push_str("}}");
        self
    }

    /// Write a comma separated list.
    pub fn list(&mut self, items: &[&str]) -> &mut Self {
        for (i, item) in items.iter().enumerate() {
            if i != 0 {
                self.buf.push_str(", ");
            }
            self.buf.push_str(item);
        }
        self
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl fmt::Display for SqlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

/// Result of the first compilation phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    pub action: Action,
    /// Name of the CTE holding the affected rows.
    pub cte: String,
}

/// Compiles mutations against one schema snapshot.
///
/// Holds no mutable state; share it freely and give every compilation its
/// own [`SqlBuilder`].
pub struct Compiler {
    schema: Arc<DBInfo>,
    flattener: Box<dyn JsonFlattener>,
    where_renderer: Box<dyn WhereRenderer>,
}

impl Compiler {
    pub fn new(schema: Arc<DBInfo>) -> Self {
        Self {
            schema,
            flattener: Box::new(JsonTree),
            where_renderer: Box::new(FilterRenderer),
        }
    }

    pub fn with_flattener(mut self, flattener: impl JsonFlattener + 'static) -> Self {
        self.flattener = Box::new(flattener);
        self
    }

    pub fn with_where_renderer(mut self, renderer: impl WhereRenderer + 'static) -> Self {
        self.where_renderer = Box::new(renderer);
        self
    }

    pub fn schema(&self) -> &DBInfo {
        &self.schema
    }

    /// Phase one: render the root mutation into `w`.
    ///
    /// On success the root selection's paging, ordering, distinct-on, filter
    /// and args are cleared so it can wrap the mutation result as a plain
    /// read. On failure `w` is restored to its previous length.
    pub fn compile_mutation(
        &self,
        qc: &mut QCode,
        w: &mut SqlBuilder,
        vars: &Variables,
    ) -> SchemaqlResult<MutationPlan> {
        let root = qc.selects.first_mut().ok_or(SchemaqlError::EmptyQuery)?;
        let start = w.len();

        let rendered = match root.action {
            Action::Insert => insert::render_insert(self, root, w, vars),
            Action::Update => update::render_update(self, root, w, vars),
            Action::Delete => delete::render_delete(self, root, w),
            other => Err(SchemaqlError::UnsupportedOperation(other.to_string())),
        };

        let cte = match rendered {
            Ok(cte) => cte,
            Err(e) => {
                w.truncate(start);
                return Err(e);
            }
        };

        tracing::debug!("Rendered {} on {}", root.action, cte);
        let action = root.action;
        root.clear_read_state();
        Ok(MutationPlan { action, cte })
    }

    /// Both phases: render the mutation, then let `select` close the
    /// statement.
    pub fn compile(
        &self,
        qc: &mut QCode,
        w: &mut SqlBuilder,
        vars: &Variables,
        select: &dyn SelectCompiler,
    ) -> SchemaqlResult<MutationPlan> {
        let plan = self.compile_mutation(qc, w, vars)?;
        select.compile_query(qc, w)?;
        Ok(plan)
    }

    /// Resolve the mutation target. Blocked tables are not visible.
    fn target_table(&self, root: &Select) -> SchemaqlResult<&DBTable> {
        let schema = root.schema.as_deref().unwrap_or(self.schema.schema());
        let qualified = || format!("{}.{}", schema, root.table);

        match self.schema.get_table(schema, &root.table) {
            Ok(t) if !t.blocked => Ok(t),
            Ok(_) | Err(SchemaqlError::NotFound { .. }) => {
                Err(SchemaqlError::TableNotFound(qualified()))
            }
            Err(e) => Err(e),
        }
    }

    /// Name the statement writes to. Tables outside the snapshot's default
    /// schema are schema-qualified so the search path cannot redirect them.
    fn target_name(&self, table: &DBTable) -> String {
        if table.schema == self.schema.schema() {
            table.name.clone()
        } else {
            table.qualified_name()
        }
    }

    fn payload<'a>(&self, root: &Select, vars: &'a Variables) -> SchemaqlResult<&'a serde_json::Value> {
        vars.get(&root.action_var)
            .ok_or_else(|| SchemaqlError::UndefinedVariable(root.action_var.clone()))
    }

    fn predicate(&self, root: &Select, table: &DBTable) -> SchemaqlResult<String> {
        let filter = root.filter.as_ref().ok_or_else(|| {
            SchemaqlError::Predicate(format!(
                "{} on '{}' requires a where clause",
                root.action,
                table.qualified_name()
            ))
        })?;
        self.where_renderer.render(filter, table)
    }
}

/// Payload fields that are columns of `table`, in the table's order.
fn payload_columns<'t>(table: &'t DBTable, flat: &Flattened) -> SchemaqlResult<Vec<&'t str>> {
    let cols: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| !c.blocked && flat.columns.contains_key(&c.name))
        .map(|c| c.name.as_str())
        .collect();

    if cols.is_empty() {
        return Err(SchemaqlError::Payload(format!(
            "no field matches a column of '{}'",
            table.qualified_name()
        )));
    }
    Ok(cols)
}

/// `WITH "input" AS (SELECT {{var}}::json AS j)`
fn render_input(w: &mut SqlBuilder, var: &str) {
    w.push("WITH ")
        .quoted("input")
        .push(" AS (SELECT ")
        .placeholder(var)
        .push("::json AS j)");
}

/// `json_populate_record[set](NULL::target, i.j) t`
fn render_expand(w: &mut SqlBuilder, target: &str, is_batch: bool) {
    if is_batch {
        w.push("json_populate_recordset");
    } else {
        w.push("json_populate_record");
    }
    w.push("(NULL::").push(target).push(", i.j) t");
}
