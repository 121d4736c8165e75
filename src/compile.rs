//! End-to-end compilation from formula text to LookML SQL.
//!
//! ```text
//! formula → tokenize → parse → analyze → render → FieldTranslation
//! ```
//!
//! Every entry point here is infallible at the type level: tokenizer,
//! parser and rendering failures are recorded on the returned value, so one
//! malformed formula never aborts a batch.
//!
//! # Example
//!
//! ```
//! use lookml_calc::compile::{FieldInput, FormulaCompiler, Role};
//!
//! let compiler = FormulaCompiler::default();
//! let field = FieldInput::new("[budget] + 1000", "padded_budget", Role::Measure);
//! let translation = compiler.compile(&field);
//! assert_eq!(translation.sql.as_deref(), Some("(${TABLE}.budget + 1000)"));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::{Complexity, ComplexityPolicy, FormulaAnalyzer, Metrics, StructuralIssue};
use crate::config::{Settings, SettingsError};
use crate::formula::{
    normalize_field_name, tokenize, DataType, FormulaError, Node, Parser, TokenKind,
    DEFAULT_MAX_DEPTH,
};
use crate::sql::{FunctionRegistry, SqlGenerator, DEFAULT_TABLE_PLACEHOLDER};

// ============================================================================
// Inbound Types
// ============================================================================

/// Role the calculated field plays in the LookML view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Dimension,
    Measure,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Dimension => write!(f, "dimension"),
            Role::Measure => write!(f, "measure"),
        }
    }
}

/// One calculated field handed over by the workbook extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInput {
    pub formula: String,
    #[serde(default)]
    pub field_name: String,
    #[serde(default, alias = "target_role")]
    pub role: Role,
}

impl FieldInput {
    pub fn new(formula: impl Into<String>, field_name: impl Into<String>, role: Role) -> Self {
        Self {
            formula: formula.into(),
            field_name: field_name.into(),
            role,
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name substituted into `${...}` for field references.
    pub table_placeholder: String,

    /// Parser nesting limit.
    pub max_depth: usize,

    /// Complexity thresholds.
    pub complexity: ComplexityPolicy,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            table_placeholder: DEFAULT_TABLE_PLACEHOLDER.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            complexity: ComplexityPolicy::default(),
        }
    }
}

impl CompileOptions {
    /// Set the table placeholder.
    pub fn with_table_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.table_placeholder = placeholder.into();
        self
    }

    /// Set the parser nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the complexity thresholds.
    pub fn with_complexity(mut self, policy: ComplexityPolicy) -> Self {
        self.complexity = policy;
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A successfully parsed and analyzed formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatedField {
    pub ast_root: Node,
    pub dependencies: BTreeSet<String>,
    pub complexity: Complexity,
    pub warnings: Vec<String>,
    pub parse_confidence: f64,
    pub requires_aggregation: bool,
    pub is_deterministic: bool,
    pub data_type: DataType,
    pub metrics: Metrics,
}

/// Outcome of [`FormulaCompiler::parse_formula`].
///
/// Exactly one of `calculated_field` and `error_message` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub success: bool,
    pub calculated_field: Option<CalculatedField>,
    pub error_message: Option<String>,
    /// The failure, with its source position when known.
    pub error: Option<FormulaError>,
    /// Tokens produced, excluding the end marker.
    pub tokens_count: usize,
    pub ast_nodes_count: usize,
}

impl ParseResult {
    fn failure(error: FormulaError, tokens_count: usize) -> Self {
        Self {
            success: false,
            calculated_field: None,
            error_message: Some(error.to_string()),
            error: Some(error),
            tokens_count,
            ast_nodes_count: 0,
        }
    }
}

/// Outbound record for the LookML generation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTranslation {
    pub field_name: String,
    pub role: Role,
    pub original_formula: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast: Option<Node>,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    pub parse_confidence: f64,
    pub requires_aggregation: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(skip)]
    pub error: Option<FormulaError>,
}

impl FieldTranslation {
    pub fn is_success(&self) -> bool {
        self.sql.is_some()
    }

    fn success(input: &FieldInput, field: CalculatedField, sql: String) -> Self {
        Self {
            field_name: input.field_name.clone(),
            role: input.role,
            original_formula: input.formula.clone(),
            dependencies: field.dependencies.into_iter().collect(),
            complexity: Some(field.complexity),
            parse_confidence: field.parse_confidence,
            requires_aggregation: field.requires_aggregation,
            warnings: field.warnings,
            ast: Some(field.ast_root),
            sql: Some(sql),
            parse_error: None,
            error: None,
        }
    }

    /// Record for a formula that could not be compiled.
    ///
    /// Dependencies still come from a bracket scan of the raw text so the
    /// field can be migrated by hand.
    fn failure(input: &FieldInput, error: FormulaError) -> Self {
        Self {
            field_name: input.field_name.clone(),
            role: input.role,
            original_formula: input.formula.clone(),
            ast: None,
            dependencies: fallback_dependencies(&input.formula).into_iter().collect(),
            complexity: None,
            parse_confidence: 0.0,
            requires_aggregation: false,
            warnings: Vec::new(),
            sql: None,
            parse_error: Some(error.to_string()),
            error: Some(error),
        }
    }
}

static BRACKETED_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// Normalized names of every `[bracketed]` reference in `formula`.
pub fn fallback_dependencies(formula: &str) -> BTreeSet<String> {
    BRACKETED_FIELD
        .captures_iter(formula)
        .filter_map(|caps| caps.get(1))
        .map(|m| normalize_field_name(m.as_str()))
        .filter(|name| !name.is_empty())
        .collect()
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles calculated-field formulas against a function registry.
///
/// Holds no per-formula state; a single compiler can be shared across
/// threads and reused for any number of formulas.
#[derive(Debug, Clone)]
pub struct FormulaCompiler {
    registry: FunctionRegistry,
    options: CompileOptions,
}

impl Default for FormulaCompiler {
    fn default() -> Self {
        Self::new(FunctionRegistry::builtin())
    }
}

impl FormulaCompiler {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a compiler from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let options = CompileOptions::default()
            .with_table_placeholder(settings.compiler.table_placeholder.clone())
            .with_max_depth(settings.compiler.max_depth)
            .with_complexity(settings.complexity);
        Ok(Self::new(settings.registry()?).with_options(options))
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Tokenize, parse and analyze one formula.
    ///
    /// Calls to functions missing from the registry fail the formula, since
    /// no SQL could be rendered for them.
    pub fn parse_formula(&self, formula: &str, role: Role) -> ParseResult {
        let tokens = match tokenize(formula) {
            Ok(tokens) => tokens,
            Err(err) => return ParseResult::failure(err, 0),
        };
        let tokens_count = tokens.iter().filter(|t| t.kind != TokenKind::Eof).count();

        let root = match Parser::new(tokens)
            .with_max_depth(self.options.max_depth)
            .parse()
        {
            Ok(root) => root,
            Err(err) => return ParseResult::failure(err, tokens_count),
        };

        let analysis = FormulaAnalyzer::new(&self.registry)
            .with_policy(self.options.complexity)
            .analyze(&root);

        let unsupported = analysis.issues.iter().find_map(|issue| match issue {
            StructuralIssue::UnknownFunction { name } => Some(name.clone()),
            _ => None,
        });
        if let Some(name) = unsupported {
            return ParseResult::failure(FormulaError::UnsupportedFunction { name }, tokens_count);
        }

        let mut warnings = analysis.warnings();
        warnings.extend(role_warning(role, analysis.requires_aggregation));
        let parse_confidence = (1.0 - 0.1 * warnings.len() as f64).max(0.0);

        let ast_nodes_count = analysis.metrics.node_count;
        ParseResult {
            success: true,
            calculated_field: Some(CalculatedField {
                ast_root: root,
                dependencies: analysis.dependencies,
                complexity: analysis.complexity,
                warnings,
                parse_confidence,
                requires_aggregation: analysis.requires_aggregation,
                is_deterministic: analysis.is_deterministic,
                data_type: analysis.data_type,
                metrics: analysis.metrics,
            }),
            error_message: None,
            error: None,
            tokens_count,
            ast_nodes_count,
        }
    }

    /// Compile one field to its outbound record.
    pub fn compile(&self, input: &FieldInput) -> FieldTranslation {
        let result = self.parse_formula(&input.formula, input.role);

        let field = match (result.calculated_field, result.error) {
            (Some(field), _) => field,
            (None, error) => {
                let error = error.unwrap_or(FormulaError::EmptyFormula);
                warn!(
                    "Failed to compile formula for field '{}': {}",
                    input.field_name, error
                );
                return FieldTranslation::failure(input, error);
            }
        };

        for warning in &field.warnings {
            warn!("Field '{}': {}", input.field_name, warning);
        }

        match SqlGenerator::new(&self.registry).render(&field.ast_root, &self.options.table_placeholder)
        {
            Ok(sql) => {
                debug!("Compiled field '{}' to {}", input.field_name, sql);
                FieldTranslation::success(input, field, sql)
            }
            Err(error) => {
                warn!(
                    "Failed to render SQL for field '{}': {}",
                    input.field_name, error
                );
                FieldTranslation::failure(input, error)
            }
        }
    }

    /// Compile many fields, preserving input order.
    pub fn compile_batch(&self, inputs: &[FieldInput]) -> Vec<FieldTranslation> {
        let translations: Vec<_> = inputs.iter().map(|input| self.compile(input)).collect();
        let failed = translations.iter().filter(|t| !t.is_success()).count();
        debug!(
            "Compiled {} fields ({} failed)",
            translations.len(),
            failed
        );
        translations
    }
}

fn role_warning(role: Role, requires_aggregation: bool) -> Option<String> {
    match (role, requires_aggregation) {
        (Role::Measure, false) => Some(
            "Measure formula contains no aggregate function; LookML will need an explicit measure type"
                .to_string(),
        ),
        (Role::Dimension, true) => Some(
            "Dimension formula contains an aggregate function; consider declaring it as a measure"
                .to_string(),
        ),
        _ => None,
    }
}
