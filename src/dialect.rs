//! Static capability registry for the supported SQL dialects.
//!
//! Behavioral variance between backends is data, not a type hierarchy: each
//! dialect contributes one [`DialectCapabilities`] row, consulted at decision
//! points (ignore strategy, batch sizing, length counting, placeholder style).
//! The table is built once at first use and never mutated afterward.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::InsertError;

/// How a dialect counts a string against a declared column length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    /// User-perceived characters; multi-byte sequences count as one unit.
    Chars,
    /// Raw encoded bytes.
    Bytes,
}

/// Placeholder syntax the dialect expects in parameterized SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` positional placeholders (sqlite, mysql, mssql).
    Positional,
    /// `$1`, `$2`, ... numbered placeholders (postgresql).
    Numbered,
}

/// Syntax a dialect uses to absorb per-row conflicts during insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreSyntax {
    /// `INSERT OR IGNORE INTO ...` (sqlite)
    OrIgnore,
    /// `INSERT IGNORE INTO ...` (mysql)
    InsertIgnore,
    /// `INSERT INTO ... ON CONFLICT DO NOTHING` (postgresql)
    OnConflictDoNothing,
}

/// Per-dialect feature flags governing which insert strategies are legal.
#[derive(Debug, Clone)]
pub struct DialectCapabilities {
    /// Registered dialect name.
    pub name: &'static str,
    /// Conflict-ignore syntax, or `None` when the dialect has no such form.
    pub ignore_syntax: Option<IgnoreSyntax>,
    /// Whether `RETURNING <col>` can fetch the generated key in-statement.
    pub supports_returning: bool,
    /// Upper bound on rows per dispatched sub-batch.
    pub max_batch_size: usize,
    /// String-length counting convention for declared max lengths.
    pub length_unit: LengthUnit,
    /// Placeholder syntax for parameterized statements.
    pub placeholder_style: PlaceholderStyle,
}

pub const SQLITE: &str = "sqlite";
pub const POSTGRESQL: &str = "postgresql";
pub const MYSQL: &str = "mysql";
pub const MSSQL: &str = "mssql";

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, DialectCapabilities> = {
        let mut m = HashMap::new();
        m.insert(
            SQLITE,
            DialectCapabilities {
                name: SQLITE,
                ignore_syntax: Some(IgnoreSyntax::OrIgnore),
                supports_returning: true,
                max_batch_size: 500,
                length_unit: LengthUnit::Chars,
                placeholder_style: PlaceholderStyle::Positional,
            },
        );
        m.insert(
            POSTGRESQL,
            DialectCapabilities {
                name: POSTGRESQL,
                ignore_syntax: Some(IgnoreSyntax::OnConflictDoNothing),
                supports_returning: true,
                max_batch_size: 1000,
                length_unit: LengthUnit::Chars,
                placeholder_style: PlaceholderStyle::Numbered,
            },
        );
        m.insert(
            MYSQL,
            DialectCapabilities {
                name: MYSQL,
                ignore_syntax: Some(IgnoreSyntax::InsertIgnore),
                supports_returning: false,
                max_batch_size: 1000,
                length_unit: LengthUnit::Chars,
                placeholder_style: PlaceholderStyle::Positional,
            },
        );
        m.insert(
            MSSQL,
            DialectCapabilities {
                name: MSSQL,
                ignore_syntax: None,
                supports_returning: false,
                max_batch_size: 1000,
                length_unit: LengthUnit::Bytes,
                placeholder_style: PlaceholderStyle::Positional,
            },
        );
        m
    };
}

/// Look up the capability descriptor for a registered dialect.
///
/// # Errors
/// Returns `InsertError::UnknownDialect` for names that were never registered.
pub fn capabilities_for(dialect: &str) -> Result<&'static DialectCapabilities, InsertError> {
    REGISTRY
        .get(dialect)
        .ok_or_else(|| InsertError::UnknownDialect(dialect.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_dialects_resolve() {
        for name in [SQLITE, POSTGRESQL, MYSQL, MSSQL] {
            assert_eq!(capabilities_for(name).unwrap().name, name);
        }
    }

    #[test]
    fn unknown_dialect_errors() {
        let err = capabilities_for("oracle").unwrap_err();
        assert!(matches!(err, InsertError::UnknownDialect(ref d) if d == "oracle"));
    }

    #[test]
    fn mssql_has_no_ignore_form_and_counts_bytes() {
        let caps = capabilities_for(MSSQL).unwrap();
        assert!(caps.ignore_syntax.is_none());
        assert_eq!(caps.length_unit, LengthUnit::Bytes);
    }
}
