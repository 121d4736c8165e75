//! Typed syntax tree for calculation formulas.
//!
//! Every node kind is its own variant and carries only the fields it needs.
//! Children are owned through `Box`/`Vec`, so a tree is acyclic by
//! construction. The parser never mutates a tree after returning it.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Core Node Type
// =============================================================================

/// A formula syntax tree node.
///
/// Serializes in the internally tagged form consumed by the LookML
/// generation layer, e.g. `{"node_type": "field_ref", "field_name": "sales"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum Node {
    /// `[Field Name]`, stored normalized without brackets.
    FieldRef { field_name: String },

    /// String, number, boolean or NULL constant.
    Literal {
        #[serde(flatten)]
        value: Literal,
    },

    /// `-x` or `NOT x`
    Unary { operator: UnaryOp, operand: Box<Node> },

    /// `+ - * / %`
    Arithmetic {
        operator: ArithmeticOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// `= <> < > <= >=`
    Comparison {
        operator: ComparisonOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// `AND` / `OR`
    Logical {
        operator: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// `IF c THEN t ELSE e END`
    Conditional {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },

    /// CASE expression.
    ///
    /// `case_expression: None` is a searched CASE whose WHEN conditions are
    /// boolean expressions; `Some` is a simple CASE whose WHEN values are
    /// compared against the case expression.
    Case {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        case_expression: Option<Box<Node>>,
        when_clauses: Vec<WhenClause>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_branch: Option<Box<Node>>,
    },

    /// `NAME(arg, ...)`, name stored upper-cased.
    FunctionCall {
        function_name: String,
        arguments: Vec<Node>,
    },
}

/// One `WHEN ... THEN ...` arm of a CASE expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenClause {
    pub condition: Node,
    pub result: Node,
}

impl WhenClause {
    pub fn new(condition: Node, result: Node) -> Self {
        Self { condition, result }
    }
}

// =============================================================================
// Literals and Data Types
// =============================================================================

/// Literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data_type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    String(String),
    Integer(i64),
    Real(f64),
    /// Numeral kept as written because no `i64`/`f64` prints back to the
    /// same text, e.g. `1.50` or `99999999999999999999`.
    Decimal(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::String(_) => DataType::String,
            Literal::Integer(_) => DataType::Integer,
            Literal::Real(_) => DataType::Real,
            Literal::Decimal(text) if text.contains('.') => DataType::Real,
            Literal::Decimal(_) => DataType::Integer,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Null => DataType::Null,
        }
    }

    /// Numeric value of a number literal, possibly rounded.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(n) => Some(*n as f64),
            Literal::Real(f) => Some(*f),
            Literal::Decimal(text) => text.parse().ok(),
            _ => None,
        }
    }
}

/// Result type of an expression, as far as it can be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Real,
    Boolean,
    Date,
    Datetime,
    Null,
    Unknown,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Real => "real",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
            DataType::Null => "null",
            DataType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Negate,
    #[serde(rename = "NOT")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">=")]
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "NOT",
        }
    }
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
        }
    }
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::GtEq => ">=",
        }
    }
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

// =============================================================================
// Constructors and Traversal
// =============================================================================

impl Node {
    /// Create a field reference.
    pub fn field(name: impl Into<String>) -> Self {
        Node::FieldRef {
            field_name: name.into(),
        }
    }

    pub fn literal(value: Literal) -> Self {
        Node::Literal { value }
    }

    pub fn int(value: i64) -> Self {
        Node::literal(Literal::Integer(value))
    }

    pub fn real(value: f64) -> Self {
        Node::literal(Literal::Real(value))
    }

    pub fn decimal(text: impl Into<String>) -> Self {
        Node::literal(Literal::Decimal(text.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::literal(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Node::literal(Literal::Boolean(value))
    }

    pub fn null() -> Self {
        Node::literal(Literal::Null)
    }

    pub fn unary(operator: UnaryOp, operand: Node) -> Self {
        Node::Unary {
            operator,
            operand: Box::new(operand),
        }
    }

    pub fn arithmetic(left: Node, operator: ArithmeticOp, right: Node) -> Self {
        Node::Arithmetic {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn comparison(left: Node, operator: ComparisonOp, right: Node) -> Self {
        Node::Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logical(left: Node, operator: LogicalOp, right: Node) -> Self {
        Node::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn conditional(condition: Node, then_branch: Node, else_branch: Node) -> Self {
        Node::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    /// Create a searched CASE (`CASE WHEN cond THEN ... END`).
    pub fn searched_case(when_clauses: Vec<WhenClause>, else_branch: Option<Node>) -> Self {
        Node::Case {
            case_expression: None,
            when_clauses,
            else_branch: else_branch.map(Box::new),
        }
    }

    /// Create a simple CASE (`CASE expr WHEN value THEN ... END`).
    pub fn simple_case(
        case_expression: Node,
        when_clauses: Vec<WhenClause>,
        else_branch: Option<Node>,
    ) -> Self {
        Node::Case {
            case_expression: Some(Box::new(case_expression)),
            when_clauses,
            else_branch: else_branch.map(Box::new),
        }
    }

    pub fn function(name: impl Into<String>, arguments: Vec<Node>) -> Self {
        Node::FunctionCall {
            function_name: name.into(),
            arguments,
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::FieldRef { .. } | Node::Literal { .. } => Vec::new(),
            Node::Unary { operand, .. } => vec![operand],
            Node::Arithmetic { left, right, .. }
            | Node::Comparison { left, right, .. }
            | Node::Logical { left, right, .. } => vec![left, right],
            Node::Conditional {
                condition,
                then_branch,
                else_branch,
            } => vec![condition, then_branch, else_branch],
            Node::Case {
                case_expression,
                when_clauses,
                else_branch,
            } => {
                let mut children: Vec<&Node> = Vec::new();
                if let Some(expr) = case_expression {
                    children.push(expr);
                }
                for clause in when_clauses {
                    children.push(&clause.condition);
                    children.push(&clause.result);
                }
                if let Some(expr) = else_branch {
                    children.push(expr);
                }
                children
            }
            Node::FunctionCall { arguments, .. } => arguments.iter().collect(),
        }
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Node::depth)
            .max()
            .unwrap_or(0)
    }

    /// Short name of the node kind, matching its serialized `node_type`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::FieldRef { .. } => "field_ref",
            Node::Literal { .. } => "literal",
            Node::Unary { .. } => "unary",
            Node::Arithmetic { .. } => "arithmetic",
            Node::Comparison { .. } => "comparison",
            Node::Logical { .. } => "logical",
            Node::Conditional { .. } => "conditional",
            Node::Case { .. } => "case",
            Node::FunctionCall { .. } => "function_call",
        }
    }
}
