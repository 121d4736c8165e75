//! SQL generation for formula syntax trees.
//!
//! - [`registry`] - Tableau function table and rendering rules
//! - [`codegen`] - Recursive SQL renderer
//! - [`helpers`] - Quoting and literal formatting

pub mod codegen;
pub mod helpers;
pub mod registry;

#[cfg(test)]
pub mod test_utils;

pub use codegen::{render, SqlGenerator, DEFAULT_TABLE_PLACEHOLDER};
pub use registry::{
    builtin_registry, DateUnit, FunctionCategory, FunctionRegistry, FunctionSpec, SqlRule,
};
