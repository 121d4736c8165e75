//! Error types for formula compilation.

use thiserror::Error;

/// Errors raised while tokenizing, parsing, or rendering a formula.
///
/// Tokenizer and parser errors terminate compilation of the one formula they
/// occur in. Structural issues found by the analyzer are not errors; see
/// [`crate::analysis::StructuralIssue`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Unrecognized character '{character}' at position {position}")]
    Tokenize { character: char, position: usize },

    #[error("Empty field reference at position {position}")]
    EmptyFieldName { position: usize },

    #[error("Formula is empty")]
    EmptyFormula,

    #[error("Expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Unbalanced parentheses: missing ')' for '(' at position {position}")]
    UnbalancedParens { position: usize },

    #[error("Missing '{keyword}': found {found} at position {position}")]
    MissingKeyword {
        keyword: &'static str,
        found: String,
        position: usize,
    },

    #[error("Empty argument in call to {function} at position {position}")]
    EmptyArgument { function: String, position: usize },

    #[error("Formula nesting exceeds the maximum depth of {limit} at position {position}")]
    DepthLimitExceeded { limit: usize, position: usize },

    #[error("Unsupported function: {name}")]
    UnsupportedFunction { name: String },

    #[error("Invalid arguments for {function}: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("Cannot render non-finite number {value}")]
    NonFiniteNumber { value: f64 },
}

impl FormulaError {
    /// Byte offset of the offending input, when the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            FormulaError::Tokenize { position, .. }
            | FormulaError::EmptyFieldName { position }
            | FormulaError::UnexpectedToken { position, .. }
            | FormulaError::UnbalancedParens { position }
            | FormulaError::MissingKeyword { position, .. }
            | FormulaError::EmptyArgument { position, .. }
            | FormulaError::DepthLimitExceeded { position, .. } => Some(*position),
            FormulaError::EmptyFormula
            | FormulaError::UnsupportedFunction { .. }
            | FormulaError::InvalidArguments { .. }
            | FormulaError::NonFiniteNumber { .. } => None,
        }
    }

    /// Short label for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            FormulaError::Tokenize { .. } | FormulaError::EmptyFieldName { .. } => "tokenize",
            FormulaError::EmptyFormula
            | FormulaError::UnexpectedToken { .. }
            | FormulaError::UnbalancedParens { .. }
            | FormulaError::MissingKeyword { .. }
            | FormulaError::EmptyArgument { .. }
            | FormulaError::DepthLimitExceeded { .. } => "syntax",
            FormulaError::UnsupportedFunction { .. } => "unsupported_function",
            FormulaError::InvalidArguments { .. } | FormulaError::NonFiniteNumber { .. } => {
                "invalid_arguments"
            }
        }
    }
}

pub type FormulaResult<T> = Result<T, FormulaError>;
