//! Default where-clause renderer.

use serde_json::Value;

use super::WhereRenderer;
use crate::error::{SchemaqlError, SchemaqlResult};
use crate::qcode::{Exp, Operand};
use crate::schema::DBTable;

/// Renders a filter tree with bare column names, e.g. `id = 5 AND (a = 1 OR
/// b IS NULL)`. Every column must exist, and not be blocked, in the target
/// table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterRenderer;

impl WhereRenderer for FilterRenderer {
    fn render(&self, filter: &Exp, table: &DBTable) -> SchemaqlResult<String> {
        let mut out = String::new();
        render_exp(filter, table, &mut out, true)?;
        Ok(out)
    }
}

fn render_exp(exp: &Exp, table: &DBTable, out: &mut String, top: bool) -> SchemaqlResult<()> {
    match exp {
        Exp::And(children) => render_group(children, " AND ", "true", table, out, top),
        Exp::Or(children) => render_group(children, " OR ", "false", table, out, top),
        Exp::Not(child) => {
            out.push_str("NOT (");
            render_exp(child, table, out, true)?;
            out.push(')');
            Ok(())
        }
        Exp::Compare { column, op, value } => {
            out.push_str(column_name(table, column)?);
            out.push(' ');
            out.push_str(op.as_sql());
            out.push(' ');
            render_operand(value, out)
        }
        Exp::IsNull { column, negated } => {
            out.push_str(column_name(table, column)?);
            out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            Ok(())
        }
        Exp::In {
            column,
            values,
            negated,
        } => {
            if values.is_empty() {
                return Err(SchemaqlError::Predicate(format!(
                    "empty value list for '{}'",
                    column
                )));
            }
            out.push_str(column_name(table, column)?);
            out.push_str(if *negated { " NOT IN (" } else { " IN (" });
            for (i, v) in values.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                render_operand(v, out)?;
            }
            out.push(')');
            Ok(())
        }
    }
}

fn render_group(
    children: &[Exp],
    joiner: &str,
    empty: &str,
    table: &DBTable,
    out: &mut String,
    top: bool,
) -> SchemaqlResult<()> {
    match children {
        [] => out.push_str(empty),
        [only] => render_exp(only, table, out, top)?,
        _ => {
            if !top {
                out.push('(');
            }
            for (i, child) in children.iter().enumerate() {
                if i != 0 {
                    out.push_str(joiner);
                }
                render_exp(child, table, out, false)?;
            }
            if !top {
                out.push(')');
            }
        }
    }
    Ok(())
}

fn column_name<'t>(table: &'t DBTable, name: &str) -> SchemaqlResult<&'t str> {
    match table.get_column(name) {
        Some(c) if !c.blocked => Ok(c.name.as_str()),
        _ => Err(SchemaqlError::Predicate(format!(
            "column '{}' not found in table '{}'",
            name,
            table.qualified_name()
        ))),
    }
}

fn render_operand(op: &Operand, out: &mut String) -> SchemaqlResult<()> {
    match op {
        Operand::Var(name) => {
            out.push_str("{{");
            out.push_str(name);
            out.push_str("}}");
        }
        Operand::Value(Value::Null) => out.push_str("NULL"),
        Operand::Value(Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
        Operand::Value(Value::Number(n)) => out.push_str(&n.to_string()),
        Operand::Value(Value::String(s)) => {
            out.push('\'');
            out.push_str(&s.replace('\'', "''"));
            out.push('\'');
        }
        Operand::Value(other) => {
            return Err(SchemaqlError::Predicate(format!(
                "unsupported literal in filter: {}",
                other
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qcode::CmpOp;
    use crate::schema::DBColumn;

    fn table() -> DBTable {
        DBTable::new(
            "public",
            "users",
            "",
            vec![
                DBColumn::new("public", "users", "id", "bigint").primary(),
                DBColumn::new("public", "users", "name", "text"),
                DBColumn::new("public", "users", "deleted_at", "timestamptz"),
                DBColumn {
                    blocked: true,
                    ..DBColumn::new("public", "users", "password", "text")
                },
            ],
        )
    }

    fn render(exp: Exp) -> SchemaqlResult<String> {
        FilterRenderer.render(&exp, &table())
    }

    #[test]
    fn test_simple_compare() {
        assert_eq!(render(Exp::eq("id", 5)).unwrap(), "id = 5");
        assert_eq!(render(Exp::eq("ID", 5)).unwrap(), "id = 5");
    }

    #[test]
    fn test_nested_groups() {
        let exp = Exp::And(vec![
            Exp::is_null("deleted_at"),
            Exp::Or(vec![
                Exp::eq("name", "o'neil"),
                Exp::compare("id", CmpOp::Gt, Operand::var("min_id")),
            ]),
        ]);
        assert_eq!(
            render(exp).unwrap(),
            "deleted_at IS NULL AND (name = 'o''neil' OR id > {{min_id}})"
        );
    }

    #[test]
    fn test_not_and_in() {
        let exp = Exp::Not(Box::new(Exp::In {
            column: "id".into(),
            values: vec![1.into(), 2.into()],
            negated: false,
        }));
        assert_eq!(render(exp).unwrap(), "NOT (id IN (1, 2))");
    }

    #[test]
    fn test_unknown_column() {
        let err = render(Exp::eq("email", "x")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Predicate error: column 'email' not found in table 'public.users'"
        );
    }

    #[test]
    fn test_blocked_column_rejected() {
        assert!(matches!(
            render(Exp::eq("password", "x")),
            Err(SchemaqlError::Predicate(_))
        ));
    }
}
