//! # lookml-calc
//!
//! Compiles Tableau calculated-field formulas into LookML SQL expressions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Formula Text                            │
//! │        IF [revenue] > [budget] * 2 THEN ... END          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [formula::lexer]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Tokens                               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [formula::parser]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Syntax Tree (Node)                      │
//! └─────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼ [analysis]                   ▼ [sql::codegen]
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │ dependencies, complexity │   │   ${TABLE}.column SQL     │
//! │ warnings                 │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! [`compile::FormulaCompiler`] ties the stages together and produces one
//! [`compile::FieldTranslation`] per calculated field.

pub mod analysis;
pub mod compile;
pub mod config;
pub mod formula;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::analysis::{Complexity, ComplexityPolicy, FormulaAnalyzer, StructuralIssue};
    pub use crate::compile::{
        CalculatedField, CompileOptions, FieldInput, FieldTranslation, FormulaCompiler,
        ParseResult, Role,
    };
    pub use crate::config::{Settings, SettingsError};
    pub use crate::formula::{parse_formula, tokenize, FormulaError, FormulaResult, Node};
    pub use crate::sql::{FunctionRegistry, FunctionSpec, SqlGenerator, SqlRule};
}
