//! TOML-based configuration for the formula compiler.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! table_placeholder = "TABLE"
//! max_depth = 64
//!
//! [complexity]
//! simple_max_depth = 4
//! simple_max_nodes = 10
//! medium_max_depth = 7
//! medium_max_nodes = 30
//!
//! [functions.REGEXP_MATCH]
//! sql_name = "REGEXP_CONTAINS"
//! min_args = 2
//! max_args = 2
//! return_type = "boolean"
//!
//! [functions.SAFE_DIV]
//! template = "SAFE_DIVIDE({0}, {1})"
//! min_args = 2
//! max_args = 2
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::ComplexityPolicy;
use crate::formula::{DataType, DEFAULT_MAX_DEPTH};
use crate::sql::helpers::template_max_slot;
use crate::sql::{
    FunctionCategory, FunctionRegistry, FunctionSpec, SqlRule, DEFAULT_TABLE_PLACEHOLDER,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LOOKML_CALC_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Parser and renderer settings.
    pub compiler: CompilerSettings,

    /// Complexity classification thresholds.
    pub complexity: ComplexityPolicy,

    /// Custom function mappings, keyed by Tableau function name.
    pub functions: BTreeMap<String, CustomFunction>,
}

/// Parser and renderer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Name substituted into `${...}` for field references.
    pub table_placeholder: String,

    /// Maximum expression nesting depth accepted by the parser.
    pub max_depth: usize,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            table_placeholder: DEFAULT_TABLE_PLACEHOLDER.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A user-defined function mapping.
///
/// Exactly one of `sql_name` and `template` must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CustomFunction {
    /// Render as `SQL_NAME(args...)`.
    pub sql_name: Option<String>,

    /// Render from a template with `{0}`, `{1}`, ... slots.
    pub template: Option<String>,

    pub category: FunctionCategory,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub aggregate: bool,
    pub deterministic: bool,
    pub return_type: DataType,
}

impl Default for CustomFunction {
    fn default() -> Self {
        Self {
            sql_name: None,
            template: None,
            category: FunctionCategory::Other,
            min_args: 0,
            max_args: None,
            aggregate: false,
            deterministic: true,
            return_type: DataType::Unknown,
        }
    }
}

impl CustomFunction {
    /// Build the registry row for this mapping.
    pub fn to_spec(&self, name: &str) -> Result<FunctionSpec, SettingsError> {
        let rule = match (&self.sql_name, &self.template) {
            (Some(sql_name), None) => SqlRule::Rename(sql_name.clone()),
            (None, Some(template)) => SqlRule::Template(template.clone()),
            (None, None) => {
                return Err(SettingsError::InvalidConfig(format!(
                    "function '{}' needs either sql_name or template",
                    name
                )))
            }
            (Some(_), Some(_)) => {
                return Err(SettingsError::InvalidConfig(format!(
                    "function '{}' sets both sql_name and template",
                    name
                )))
            }
        };

        let mut spec = FunctionSpec::new(name, self.category, rule)
            .args(self.min_args, self.max_args)
            .returns(self.return_type);
        spec.aggregate = self.aggregate;
        spec.deterministic = self.deterministic;
        Ok(spec)
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `LOOKML_CALC_CONFIG`
    /// 2. `./lookml-calc.toml`
    /// 3. `~/.config/lookml-calc/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("lookml-calc.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lookml-calc").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check value ranges and custom function definitions.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.compiler.max_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "compiler.max_depth must be at least 1".to_string(),
            ));
        }
        if self.compiler.table_placeholder.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "compiler.table_placeholder must not be empty".to_string(),
            ));
        }

        let c = &self.complexity;
        if c.simple_max_depth > c.medium_max_depth || c.simple_max_nodes > c.medium_max_nodes {
            return Err(SettingsError::InvalidConfig(
                "complexity simple thresholds must not exceed medium thresholds".to_string(),
            ));
        }

        for (name, function) in &self.functions {
            let spec = function.to_spec(name)?;
            if spec.max_args.is_some_and(|max| max < spec.min_args) {
                return Err(SettingsError::InvalidConfig(format!(
                    "function '{}' has max_args below min_args",
                    name
                )));
            }
            if let (SqlRule::Template(template), Some(max)) = (&spec.rule, spec.max_args) {
                if template_max_slot(template).is_some_and(|slot| slot >= max) {
                    return Err(SettingsError::InvalidConfig(format!(
                        "function '{}' template references more than {} argument(s)",
                        name, max
                    )));
                }
            }
        }

        Ok(())
    }

    /// The built-in registry extended with the custom functions.
    ///
    /// Custom entries replace built-ins of the same name.
    pub fn registry(&self) -> Result<FunctionRegistry, SettingsError> {
        let mut registry = FunctionRegistry::builtin();
        for (name, function) in &self.functions {
            registry.register(function.to_spec(name)?);
        }
        Ok(registry)
    }
}
