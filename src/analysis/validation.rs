//! Structural validation of formula syntax trees.
//!
//! Issues found here are advisory: they become warnings on the compiled
//! field rather than failing it.

use crate::formula::{Literal, Node};
use crate::sql::FunctionRegistry;

/// A structural problem in a syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralIssue {
    /// Field reference with an empty name.
    EmptyFieldName,
    /// CASE without any WHEN clause.
    EmptyWhenClauses,
    /// Function call with an empty name.
    EmptyFunctionName,
    /// Real literal that is NaN or infinite.
    NonFiniteNumber { value: f64 },
    /// Function absent from the registry.
    UnknownFunction { name: String },
    /// Argument count outside the registered range.
    ArityMismatch {
        function: String,
        expected: String,
        found: usize,
    },
}

impl std::fmt::Display for StructuralIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralIssue::EmptyFieldName => write!(f, "Field reference has an empty name"),
            StructuralIssue::EmptyWhenClauses => {
                write!(f, "CASE expression has no WHEN clauses")
            }
            StructuralIssue::EmptyFunctionName => {
                write!(f, "Function call has an empty name")
            }
            StructuralIssue::NonFiniteNumber { value } => {
                write!(f, "Numeric literal {} is not finite", value)
            }
            StructuralIssue::UnknownFunction { name } => {
                write!(f, "Function '{}' is not in the function registry", name)
            }
            StructuralIssue::ArityMismatch {
                function,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Function '{}' expects {} argument(s), found {}",
                    function, expected, found
                )
            }
        }
    }
}

impl std::error::Error for StructuralIssue {}

/// Check every node of `root` against the variant invariants and `registry`.
///
/// An empty result means the tree is well-formed.
pub fn validate(root: &Node, registry: &FunctionRegistry) -> Vec<StructuralIssue> {
    let mut issues = Vec::new();
    validate_node(root, registry, &mut issues);
    issues
}

fn validate_node(node: &Node, registry: &FunctionRegistry, issues: &mut Vec<StructuralIssue>) {
    match node {
        Node::FieldRef { field_name } if field_name.trim().is_empty() => {
            issues.push(StructuralIssue::EmptyFieldName);
        }
        Node::Literal {
            value: Literal::Real(value),
        } if !value.is_finite() => {
            issues.push(StructuralIssue::NonFiniteNumber { value: *value });
        }
        Node::Case { when_clauses, .. } if when_clauses.is_empty() => {
            issues.push(StructuralIssue::EmptyWhenClauses);
        }
        Node::FunctionCall {
            function_name,
            arguments,
        } => validate_function(function_name, arguments.len(), registry, issues),
        _ => {}
    }

    for child in node.children() {
        validate_node(child, registry, issues);
    }
}

fn validate_function(
    name: &str,
    arg_count: usize,
    registry: &FunctionRegistry,
    issues: &mut Vec<StructuralIssue>,
) {
    if name.trim().is_empty() {
        issues.push(StructuralIssue::EmptyFunctionName);
        return;
    }

    match registry.get(name) {
        None => issues.push(StructuralIssue::UnknownFunction {
            name: name.to_uppercase(),
        }),
        Some(spec) if !spec.accepts_arity(arg_count) => {
            issues.push(StructuralIssue::ArityMismatch {
                function: spec.name.clone(),
                expected: spec.arity_label(),
                found: arg_count,
            });
        }
        Some(_) => {}
    }
}
