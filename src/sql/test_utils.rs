//! Test utilities for rendered SQL validation.
//!
//! Rendered expressions are wrapped in `SELECT <expr> FROM t` with every
//! `${...}` placeholder replaced by the alias `t`, then re-parsed with
//! sqlparser-rs.

use std::sync::LazyLock;

use regex::Regex;
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").unwrap());

/// Validates that a rendered expression is syntactically valid SQL.
pub fn validate_expression(sql: &str) -> Result<(), String> {
    let query = format!("SELECT {} FROM t", PLACEHOLDER.replace_all(sql, "t"));
    Parser::parse_sql(&BigQueryDialect {}, &query)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL: {}\nSQL: {}", e, query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_expression() {
        validate_expression("(${TABLE}.budget + 1000)").unwrap();
        validate_expression("CASE WHEN (${TABLE}.a > 1) THEN 'x' ELSE 'y' END").unwrap();
    }

    #[test]
    fn test_validate_invalid_expression() {
        assert!(validate_expression("(${TABLE}.budget +").is_err());
    }
}
