//! Configuration for the formula compiler.
//!
//! Handles settings discovery and custom function mappings.

mod settings;

pub use settings::{CompilerSettings, CustomFunction, Settings, SettingsError, CONFIG_ENV_VAR};
