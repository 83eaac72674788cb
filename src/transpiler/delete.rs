//! DELETE rendering.

use super::{Compiler, SqlBuilder};
use crate::error::SchemaqlResult;
use crate::qcode::Select;

/// `WITH "t" AS (DELETE FROM t WHERE pred RETURNING *)`
pub(super) fn render_delete(c: &Compiler, root: &Select, w: &mut SqlBuilder) -> SchemaqlResult<String> {
    let table = c.target_table(root)?;
    let target = c.target_name(table);
    let predicate = c.predicate(root, table)?;

    w.push("WITH ")
        .quoted(&table.name)
        .push(" AS (DELETE FROM ")
        .push(&target)
        .push(" WHERE ")
        .push(&predicate)
        .push(" RETURNING *) ");

    Ok(table.name.clone())
}
