//! Formula analysis.
//!
//! Walks a completed syntax tree to extract field dependencies, measure its
//! shape, classify its complexity, and collect structural warnings. Analysis
//! is total: it never fails, it only reports.

pub mod validation;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::formula::{ArithmeticOp, DataType, Node, UnaryOp};
use crate::sql::{FunctionRegistry, FunctionSpec};

pub use validation::{validate, StructuralIssue};

// =============================================================================
// Complexity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// Depth and node-count thresholds for [`Complexity`].
///
/// A tree is `simple` when both its depth and node count are within the
/// simple limits, `medium` when both are within the medium limits, and
/// `complex` otherwise. A leaf has depth 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityPolicy {
    pub simple_max_depth: usize,
    pub simple_max_nodes: usize,
    pub medium_max_depth: usize,
    pub medium_max_nodes: usize,
}

impl Default for ComplexityPolicy {
    fn default() -> Self {
        Self {
            simple_max_depth: 4,
            simple_max_nodes: 10,
            medium_max_depth: 7,
            medium_max_nodes: 30,
        }
    }
}

impl ComplexityPolicy {
    pub fn classify(&self, metrics: &Metrics) -> Complexity {
        if metrics.depth <= self.simple_max_depth && metrics.node_count <= self.simple_max_nodes {
            Complexity::Simple
        } else if metrics.depth <= self.medium_max_depth
            && metrics.node_count <= self.medium_max_nodes
        {
            Complexity::Medium
        } else {
            Complexity::Complex
        }
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Shape of a syntax tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub depth: usize,
    pub node_count: usize,
    pub function_count: usize,
    /// IF and CASE nodes.
    pub conditional_count: usize,
}

/// Measure depth and node counts in one traversal.
pub fn measure(node: &Node) -> Metrics {
    let mut metrics = Metrics {
        depth: 1,
        node_count: 1,
        function_count: usize::from(matches!(node, Node::FunctionCall { .. })),
        conditional_count: usize::from(matches!(
            node,
            Node::Conditional { .. } | Node::Case { .. }
        )),
    };

    for child in node.children() {
        let sub = measure(child);
        metrics.depth = metrics.depth.max(sub.depth + 1);
        metrics.node_count += sub.node_count;
        metrics.function_count += sub.function_count;
        metrics.conditional_count += sub.conditional_count;
    }

    metrics
}

/// Every field referenced anywhere in the tree.
pub fn extract_dependencies(node: &Node) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    collect_fields(node, &mut fields);
    fields
}

fn collect_fields(node: &Node, fields: &mut BTreeSet<String>) {
    if let Node::FieldRef { field_name } = node {
        fields.insert(field_name.clone());
    }
    for child in node.children() {
        collect_fields(child, fields);
    }
}

// =============================================================================
// Analyzer
// =============================================================================

/// Result of analyzing one syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub dependencies: BTreeSet<String>,
    pub complexity: Complexity,
    pub metrics: Metrics,
    pub requires_aggregation: bool,
    pub is_deterministic: bool,
    pub data_type: DataType,
    pub issues: Vec<StructuralIssue>,
}

impl Analysis {
    /// Structural issues rendered as warning strings.
    pub fn warnings(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Analyzes syntax trees against a function registry.
#[derive(Debug, Clone, Copy)]
pub struct FormulaAnalyzer<'a> {
    registry: &'a FunctionRegistry,
    policy: ComplexityPolicy,
}

impl<'a> FormulaAnalyzer<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            policy: ComplexityPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ComplexityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn analyze(&self, root: &Node) -> Analysis {
        let metrics = measure(root);
        Analysis {
            dependencies: extract_dependencies(root),
            complexity: self.policy.classify(&metrics),
            metrics,
            requires_aggregation: self.any_call(root, &|spec: &FunctionSpec| spec.aggregate),
            is_deterministic: !self.any_call(root, &|spec: &FunctionSpec| !spec.deterministic),
            data_type: self.infer_type(root),
            issues: validate(root, self.registry),
        }
    }

    /// True if some call in the tree is registered and matches `pred`.
    fn any_call(&self, node: &Node, pred: &dyn Fn(&FunctionSpec) -> bool) -> bool {
        if let Node::FunctionCall { function_name, .. } = node {
            if self.registry.get(function_name).is_some_and(pred) {
                return true;
            }
        }
        node.children()
            .into_iter()
            .any(|child| self.any_call(child, pred))
    }

    /// Best-effort result type.
    pub fn infer_type(&self, node: &Node) -> DataType {
        match node {
            Node::FieldRef { .. } => DataType::Unknown,
            Node::Literal { value } => value.data_type(),
            Node::Unary {
                operator: UnaryOp::Not,
                ..
            } => DataType::Boolean,
            Node::Unary { operand, .. } => match self.infer_type(operand) {
                t @ (DataType::Integer | DataType::Real) => t,
                _ => DataType::Unknown,
            },
            Node::Arithmetic {
                operator,
                left,
                right,
            } => {
                let (l, r) = (self.infer_type(left), self.infer_type(right));
                match (*operator, l, r) {
                    (ArithmeticOp::Add, DataType::String, _)
                    | (ArithmeticOp::Add, _, DataType::String) => DataType::String,
                    (ArithmeticOp::Divide, _, _) if is_numeric(l) && is_numeric(r) => {
                        DataType::Real
                    }
                    (_, DataType::Integer, DataType::Integer) => DataType::Integer,
                    _ if is_numeric(l) && is_numeric(r) => DataType::Real,
                    _ => DataType::Unknown,
                }
            }
            Node::Comparison { .. } | Node::Logical { .. } => DataType::Boolean,
            Node::Conditional {
                then_branch,
                else_branch,
                ..
            } => unify(self.infer_type(then_branch), self.infer_type(else_branch)),
            Node::Case {
                when_clauses,
                else_branch,
                ..
            } => when_clauses
                .iter()
                .map(|clause| self.infer_type(&clause.result))
                .chain(else_branch.iter().map(|e| self.infer_type(e)))
                .reduce(unify)
                .unwrap_or(DataType::Unknown),
            Node::FunctionCall { function_name, .. } => self
                .registry
                .get(function_name)
                .map_or(DataType::Unknown, |spec| spec.return_type),
        }
    }
}

fn is_numeric(t: DataType) -> bool {
    matches!(t, DataType::Integer | DataType::Real)
}

/// Common type of two branches.
fn unify(a: DataType, b: DataType) -> DataType {
    match (a, b) {
        _ if a == b => a,
        (DataType::Null, other) | (other, DataType::Null) => other,
        _ if is_numeric(a) && is_numeric(b) => DataType::Real,
        _ => DataType::Unknown,
    }
}
