use std::fmt::Write;

use crate::dialect::{DialectCapabilities, IgnoreSyntax, PlaceholderStyle};
use crate::error::InsertError;
use crate::model::{Condition, SqlValue};

use super::{ConflictPolicy, InsertStatement};

/// Dialect SQL text plus the parameter list bound to its placeholders.
#[derive(Debug)]
pub(crate) struct RenderedSql {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// True when the statement ends in a RETURNING clause and the adapter
    /// must fetch the generated key from the result rows.
    pub expects_returning: bool,
}

/// Render an insert statement to dialect SQL.
///
/// All rows in the statement must share one column signature; the executor
/// groups batch rows into such runs before rendering. `returning` names the
/// key column to fetch in-statement, honored only on dialects that support it.
pub(crate) fn render_insert(
    statement: &InsertStatement,
    caps: &DialectCapabilities,
    returning: Option<&str>,
) -> Result<RenderedSql, InsertError> {
    let rows = statement.rows();
    let signature = rows[0].column_signature();
    if rows.iter().any(|row| row.column_signature() != signature) {
        return Err(InsertError::Validation(format!(
            "multi-row insert into {} mixes column signatures",
            statement.table()
        )));
    }

    let ignore = match statement.policy() {
        ConflictPolicy::Fail => None,
        ConflictPolicy::Ignore => match caps.ignore_syntax {
            Some(syntax) => Some(syntax),
            None => {
                return Err(InsertError::Validation(format!(
                    "dialect {} does not support ignore-on-conflict inserts",
                    caps.name
                )));
            }
        },
    };

    let verb = match ignore {
        Some(IgnoreSyntax::OrIgnore) => "INSERT OR IGNORE INTO",
        Some(IgnoreSyntax::InsertIgnore) => "INSERT IGNORE INTO",
        Some(IgnoreSyntax::OnConflictDoNothing) | None => "INSERT INTO",
    };

    let mut sql = format!("{verb} {} ({}) VALUES ", statement.table(), signature.join(", "));
    let mut params = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        if row_idx > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (value_idx, (_, value)) in row.entries().iter().enumerate() {
            if value_idx > 0 {
                sql.push_str(", ");
            }
            if let SqlValue::Expr(expr) = value {
                sql.push_str(expr);
            } else {
                push_placeholder(&mut sql, caps.placeholder_style, params.len() + 1);
                params.push(value.clone());
            }
        }
        sql.push(')');
    }

    if matches!(ignore, Some(IgnoreSyntax::OnConflictDoNothing)) {
        sql.push_str(" ON CONFLICT DO NOTHING");
    }

    let expects_returning = match returning {
        Some(key_column) if caps.supports_returning => {
            write!(sql, " RETURNING {key_column}").ok();
            true
        }
        _ => false,
    };

    Ok(RenderedSql {
        sql,
        params,
        expects_returning,
    })
}

/// Render a delete over an opaque condition fragment. The fragment's own
/// placeholders are passed through untouched; its parameters follow ours
/// (there are none) in order.
pub(crate) fn render_delete(table: &str, condition: &Condition) -> RenderedSql {
    RenderedSql {
        sql: format!("DELETE FROM {table} WHERE {}", condition.sql()),
        params: condition.params().to_vec(),
        expects_returning: false,
    }
}

fn push_placeholder(sql: &mut String, style: PlaceholderStyle, ordinal: usize) {
    match style {
        PlaceholderStyle::Positional => sql.push('?'),
        PlaceholderStyle::Numbered => {
            write!(sql, "${ordinal}").ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MSSQL, POSTGRESQL, SQLITE, capabilities_for};
    use crate::model::{ColumnDef, ColumnType, Table};
    use crate::statement::{AssignmentSetBuilder, build};

    fn table() -> Table {
        Table::new(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Integer),
                ColumnDef::new("b", ColumnType::Text).nullable(),
            ],
        )
    }

    fn row(a: i64, b: &str) -> crate::statement::AssignmentSet {
        let mut builder = AssignmentSetBuilder::new();
        builder.set("a", a).set("b", b);
        builder.freeze(&table())
    }

    #[test]
    fn positional_single_row() {
        let stmt = build(&table(), vec![row(1, "x")], ConflictPolicy::Fail).unwrap();
        let rendered =
            render_insert(&stmt, capabilities_for(SQLITE).unwrap(), None).unwrap();
        assert_eq!(rendered.sql, "INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(rendered.params.len(), 2);
    }

    #[test]
    fn numbered_placeholders_continue_across_rows() {
        let stmt = build(
            &table(),
            vec![row(1, "x"), row(2, "y")],
            ConflictPolicy::Fail,
        )
        .unwrap();
        let rendered =
            render_insert(&stmt, capabilities_for(POSTGRESQL).unwrap(), None).unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn ignore_renders_per_dialect() {
        let stmt = build(&table(), vec![row(1, "x")], ConflictPolicy::Ignore).unwrap();
        let sqlite = render_insert(&stmt, capabilities_for(SQLITE).unwrap(), None).unwrap();
        assert!(sqlite.sql.starts_with("INSERT OR IGNORE INTO t"));
        let pg = render_insert(&stmt, capabilities_for(POSTGRESQL).unwrap(), None).unwrap();
        assert!(pg.sql.ends_with("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn ignore_without_dialect_support_fails_before_dispatch() {
        let stmt = build(&table(), vec![row(1, "x")], ConflictPolicy::Ignore).unwrap();
        let err = render_insert(&stmt, capabilities_for(MSSQL).unwrap(), None).unwrap_err();
        assert!(matches!(err, InsertError::Validation(_)));
    }

    #[test]
    fn returning_only_where_supported() {
        let stmt = build(&table(), vec![row(1, "x")], ConflictPolicy::Fail).unwrap();
        let pg = render_insert(&stmt, capabilities_for(POSTGRESQL).unwrap(), Some("a")).unwrap();
        assert!(pg.expects_returning);
        assert!(pg.sql.ends_with("RETURNING a"));
        let mssql = render_insert(&stmt, capabilities_for(MSSQL).unwrap(), Some("a")).unwrap();
        assert!(!mssql.expects_returning);
    }

    #[test]
    fn expressions_splice_without_placeholders() {
        let mut builder = AssignmentSetBuilder::new();
        builder
            .set("a", 1)
            .set("b", SqlValue::Expr("lower('ABC')".into()));
        let set = builder.freeze(&table());
        let stmt = build(&table(), vec![set], ConflictPolicy::Fail).unwrap();
        let rendered =
            render_insert(&stmt, capabilities_for(POSTGRESQL).unwrap(), None).unwrap();
        assert_eq!(rendered.sql, "INSERT INTO t (a, b) VALUES ($1, lower('ABC'))");
        assert_eq!(rendered.params.len(), 1);
    }
}
