//! Formula front end: tokens, lexer, syntax tree and parser.
//!
//! ```text
//! "IF [a] > 1 THEN 'x' ELSE 'y' END"
//!        │
//!        ▼  lexer::tokenize
//! [IF, FIELD_REF(a), OPERATOR(>), NUMBER(1), THEN, ...]
//!        │
//!        ▼  parser::parse
//! Node::Conditional { condition, then_branch, else_branch }
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    ArithmeticOp, ComparisonOp, DataType, Literal, LogicalOp, Node, UnaryOp, WhenClause,
};
pub use error::{FormulaError, FormulaResult};
pub use lexer::{normalize_field_name, tokenize};
pub use parser::{parse, Parser, DEFAULT_MAX_DEPTH};
pub use token::{Keyword, OperatorSymbol, Token, TokenKind};

/// Tokenize and parse a formula in one step.
pub fn parse_formula(formula: &str) -> FormulaResult<Node> {
    parse(tokenize(formula)?)
}
