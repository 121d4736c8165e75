//! SQL code generation from formula syntax trees.
//!
//! Every binary node renders parenthesized, so the output does not depend on
//! the target dialect's precedence table. Field references render as
//! `${TABLE}.column`, which the LookML layer resolves at query time.

use crate::formula::{FormulaError, FormulaResult, Literal, Node, UnaryOp, WhenClause};

use super::helpers::{
    fill_template, format_bool_keyword, format_real, quote_string_single, table_column,
};
use super::registry::{builtin_registry, DateUnit, FunctionRegistry, FunctionSpec, SqlRule};

/// Placeholder substituted for `TABLE` when none is configured.
pub const DEFAULT_TABLE_PLACEHOLDER: &str = "TABLE";

/// Render a node with the built-in registry.
pub fn render(node: &Node, table_placeholder: &str) -> FormulaResult<String> {
    SqlGenerator::new(builtin_registry()).render(node, table_placeholder)
}

/// Renders syntax trees against a function registry.
#[derive(Debug, Clone, Copy)]
pub struct SqlGenerator<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Render `node` as a SQL expression.
    ///
    /// Fails only on calls the registry cannot render: unknown functions,
    /// malformed literal arguments to date/percentile rules, or templates
    /// referencing missing arguments.
    pub fn render(&self, node: &Node, table_placeholder: &str) -> FormulaResult<String> {
        match node {
            Node::FieldRef { field_name } => Ok(table_column(table_placeholder, field_name)),

            Node::Literal { value } => render_literal(value),

            Node::Unary { operator, operand } => {
                let operand = self.render(operand, table_placeholder)?;
                Ok(match operator {
                    // `--` would start a SQL comment
                    UnaryOp::Negate if operand.starts_with('-') => format!("(- {})", operand),
                    UnaryOp::Negate => format!("(-{})", operand),
                    UnaryOp::Not => format!("(NOT {})", operand),
                })
            }

            Node::Arithmetic {
                operator,
                left,
                right,
            } => self.render_binary(left, operator.symbol(), right, table_placeholder),
            Node::Comparison {
                operator,
                left,
                right,
            } => self.render_binary(left, operator.symbol(), right, table_placeholder),
            Node::Logical {
                operator,
                left,
                right,
            } => self.render_binary(left, operator.symbol(), right, table_placeholder),

            Node::Conditional {
                condition,
                then_branch,
                else_branch,
            } => Ok(format!(
                "CASE WHEN {} THEN {} ELSE {} END",
                self.render(condition, table_placeholder)?,
                self.render(then_branch, table_placeholder)?,
                self.render(else_branch, table_placeholder)?,
            )),

            Node::Case {
                case_expression,
                when_clauses,
                else_branch,
            } => self.render_case(
                case_expression.as_deref(),
                when_clauses,
                else_branch.as_deref(),
                table_placeholder,
            ),

            Node::FunctionCall {
                function_name,
                arguments,
            } => self.render_function(function_name, arguments, table_placeholder),
        }
    }

    fn render_binary(
        &self,
        left: &Node,
        symbol: &str,
        right: &Node,
        table_placeholder: &str,
    ) -> FormulaResult<String> {
        Ok(format!(
            "({} {} {})",
            self.render(left, table_placeholder)?,
            symbol,
            self.render(right, table_placeholder)?,
        ))
    }

    fn render_case(
        &self,
        case_expression: Option<&Node>,
        when_clauses: &[WhenClause],
        else_branch: Option<&Node>,
        table_placeholder: &str,
    ) -> FormulaResult<String> {
        let mut parts = vec!["CASE".to_string()];

        if let Some(expr) = case_expression {
            parts.push(self.render(expr, table_placeholder)?);
        }
        for clause in when_clauses {
            parts.push(format!(
                "WHEN {} THEN {}",
                self.render(&clause.condition, table_placeholder)?,
                self.render(&clause.result, table_placeholder)?,
            ));
        }
        if let Some(expr) = else_branch {
            parts.push(format!("ELSE {}", self.render(expr, table_placeholder)?));
        }
        parts.push("END".to_string());

        Ok(parts.join(" "))
    }

    // =========================================================================
    // Function calls
    // =========================================================================

    fn render_function(
        &self,
        name: &str,
        arguments: &[Node],
        table_placeholder: &str,
    ) -> FormulaResult<String> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| FormulaError::UnsupportedFunction {
                name: name.to_uppercase(),
            })?;

        let rendered = arguments
            .iter()
            .map(|arg| self.render(arg, table_placeholder))
            .collect::<FormulaResult<Vec<_>>>()?;

        match &spec.rule {
            SqlRule::Rename(sql_name) => Ok(format!("{}({})", sql_name, rendered.join(", "))),

            SqlRule::Template(template) => {
                fill_template(template, &rendered).map_err(|index| {
                    invalid(
                        spec,
                        format!(
                            "argument {{{}}} is required but {} supplied",
                            index,
                            rendered.len()
                        ),
                    )
                })
            }

            SqlRule::Percentile => {
                expect_count(spec, &rendered, 2)?;
                let fraction = match &arguments[1] {
                    Node::Literal { value } => value.as_f64(),
                    _ => None,
                };
                match fraction {
                    Some(f) if (0.0..=1.0).contains(&f) => Ok(format!(
                        "PERCENTILE_CONT({}, {})",
                        rendered[0], rendered[1]
                    )),
                    _ => Err(invalid(
                        spec,
                        "second argument must be a numeric literal between 0 and 1".to_string(),
                    )),
                }
            }

            SqlRule::DateAdd => {
                expect_count(spec, &rendered, 3)?;
                let unit = date_unit(spec, &arguments[0])?;
                let function = if unit.is_time_of_day() {
                    "DATETIME_ADD"
                } else {
                    "DATE_ADD"
                };
                Ok(format!(
                    "{}({}, INTERVAL {} {})",
                    function,
                    rendered[2],
                    rendered[1],
                    unit.as_sql()
                ))
            }

            SqlRule::DateDiff => {
                expect_count(spec, &rendered, 3)?;
                let unit = date_unit(spec, &arguments[0])?;
                let function = if unit.is_time_of_day() {
                    "DATETIME_DIFF"
                } else {
                    "DATE_DIFF"
                };
                Ok(format!(
                    "{}({}, {}, {})",
                    function,
                    rendered[2],
                    rendered[1],
                    unit.as_sql()
                ))
            }

            SqlRule::DateTrunc => {
                expect_count(spec, &rendered, 2)?;
                let unit = date_unit(spec, &arguments[0])?;
                let function = if unit.is_time_of_day() {
                    "DATETIME_TRUNC"
                } else {
                    "DATE_TRUNC"
                };
                Ok(format!("{}({}, {})", function, rendered[1], unit.as_sql()))
            }

            SqlRule::DatePart => {
                expect_count(spec, &rendered, 2)?;
                let unit = date_unit(spec, &arguments[0])?;
                Ok(format!("EXTRACT({} FROM {})", unit.as_sql(), rendered[1]))
            }
        }
    }
}

fn render_literal(value: &Literal) -> FormulaResult<String> {
    Ok(match value {
        Literal::String(s) => quote_string_single(s),
        Literal::Integer(n) => n.to_string(),
        Literal::Real(f) => format_real(*f).ok_or(FormulaError::NonFiniteNumber { value: *f })?,
        Literal::Decimal(text) => text.clone(),
        Literal::Boolean(b) => format_bool_keyword(*b).to_string(),
        Literal::Null => "NULL".to_string(),
    })
}

fn invalid(spec: &FunctionSpec, message: String) -> FormulaError {
    FormulaError::InvalidArguments {
        function: spec.name.clone(),
        message,
    }
}

fn expect_count(spec: &FunctionSpec, rendered: &[String], count: usize) -> FormulaResult<()> {
    if rendered.len() == count {
        Ok(())
    } else {
        Err(invalid(
            spec,
            format!("expected {} arguments, found {}", count, rendered.len()),
        ))
    }
}

/// First argument of a date-unit function: a string literal naming the unit.
fn date_unit(spec: &FunctionSpec, node: &Node) -> FormulaResult<DateUnit> {
    match node {
        Node::Literal {
            value: Literal::String(name),
        } => DateUnit::parse(name)
            .ok_or_else(|| invalid(spec, format!("unknown date part '{}'", name))),
        _ => Err(invalid(
            spec,
            "first argument must be a date part string such as 'month'".to_string(),
        )),
    }
}
