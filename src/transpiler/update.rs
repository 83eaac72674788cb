//! UPDATE rendering.

use super::{Compiler, SqlBuilder, Variables, payload_columns, render_expand, render_input};
use crate::error::SchemaqlResult;
use crate::qcode::Select;

/// `WITH "t" AS (WITH "input" AS (...) UPDATE t SET (cols) = (SELECT cols FROM
/// input i, json_populate_record(NULL::t, i.j) t) WHERE pred RETURNING *)`
pub(super) fn render_update(
    c: &Compiler,
    root: &Select,
    w: &mut SqlBuilder,
    vars: &Variables,
) -> SchemaqlResult<String> {
    let payload = c.payload(root, vars)?;
    let table = c.target_table(root)?;
    let target = c.target_name(table);
    let flat = c.flattener.flatten(payload)?;
    let cols = payload_columns(table, &flat)?;
    let predicate = c.predicate(root, table)?;

    w.push("WITH ").quoted(&table.name).push(" AS (");
    render_input(w, &root.action_var);
    w.push(" UPDATE ")
        .push(&target)
        .push(" SET (")
        .list(&cols)
        .push(") = (SELECT ")
        .list(&cols)
        .push(" FROM input i, ");
    render_expand(w, &target, flat.is_batch);
    w.push(") WHERE ").push(&predicate).push(" RETURNING *) ");

    Ok(table.name.clone())
}
