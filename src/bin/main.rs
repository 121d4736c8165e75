//! lookml-calc CLI - Compile Tableau calculated fields to LookML SQL
//!
//! Usage:
//!   lookml-calc compile <formula> [--field <name>] [--role <role>] [--table <placeholder>]
//!   lookml-calc batch <file.json|-> [--pretty]
//!   lookml-calc functions [--category <category>]
//!
//! Examples:
//!   lookml-calc compile "IF [revenue] > [budget] THEN 'over' ELSE 'under' END"
//!   lookml-calc compile "SUM([sales]) / COUNTD([orders])" --role measure --output json
//!   lookml-calc batch fields.json --pretty

use ariadne::{Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record};
use lookml_calc::compile::{FieldInput, FormulaCompiler, Role};
use lookml_calc::config::Settings;
use lookml_calc::formula::FormulaError;
use lookml_calc::sql::{FunctionCategory, FunctionSpec, SqlRule};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "lookml-calc")]
#[command(about = "Compile Tableau calculated-field formulas into LookML SQL")]
#[command(version)]
struct Cli {
    /// Path to a config file (overrides discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a single formula
    Compile {
        /// The Tableau formula
        formula: String,

        /// Name of the calculated field
        #[arg(short, long, default_value = "calculated_field")]
        field: String,

        /// Role of the field in the LookML view
        #[arg(short, long, default_value = "dimension")]
        role: RoleArg,

        /// Table placeholder substituted into ${...}
        #[arg(short, long)]
        table: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Compile a JSON array of {formula, field_name, role} objects
    Batch {
        /// Path to the JSON file, or - for stdin
        file: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the supported functions
    Functions {
        /// Only list one category
        #[arg(short, long)]
        category: Option<CategoryArg>,
    },
}

#[derive(Clone, ValueEnum)]
enum RoleArg {
    Dimension,
    Measure,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Dimension => Role::Dimension,
            RoleArg::Measure => Role::Measure,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum CategoryArg {
    Aggregate,
    String,
    Math,
    Date,
    Conversion,
    Logical,
    Other,
}

impl From<CategoryArg> for FunctionCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Aggregate => FunctionCategory::Aggregate,
            CategoryArg::String => FunctionCategory::String,
            CategoryArg::Math => FunctionCategory::Math,
            CategoryArg::Date => FunctionCategory::Date,
            CategoryArg::Conversion => FunctionCategory::Conversion,
            CategoryArg::Logical => FunctionCategory::Logical,
            CategoryArg::Other => FunctionCategory::Other,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output the full translation record
    Json,
}

// ============================================================================
// Logging
// ============================================================================

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", format_record(record));
        }
    }

    fn flush(&self) {}
}

fn format_record(record: &Record) -> String {
    format!("[{} {}] {}", record.level(), record.target(), record.args())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, _) => LevelFilter::Debug,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile {
            formula,
            field,
            role,
            table,
            output,
        } => cmd_compile(&settings, formula, field, role, table, output),
        Commands::Batch { file, pretty } => cmd_batch(&settings, &file, pretty),
        Commands::Functions { category } => cmd_functions(&settings, category),
    }
}

fn cmd_compile(
    settings: &Settings,
    formula: String,
    field: String,
    role: RoleArg,
    table: Option<String>,
    output: OutputFormat,
) -> ExitCode {
    let mut settings = settings.clone();
    if let Some(table) = table {
        settings.compiler.table_placeholder = table;
    }

    let compiler = match FormulaCompiler::from_settings(&settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let translation = compiler.compile(&FieldInput::new(formula, field, role.into()));

    if let Some(error) = &translation.error {
        report_error(&translation.original_formula, error);
        return ExitCode::FAILURE;
    }

    match output {
        OutputFormat::Sql => {
            for warning in &translation.warnings {
                eprintln!("warning: {}", warning);
            }
            if let Some(sql) = &translation.sql {
                println!("{}", sql);
            }
            ExitCode::SUCCESS
        }
        OutputFormat::Json => print_json(&translation, true),
    }
}

fn cmd_batch(settings: &Settings, file: &str, pretty: bool) -> ExitCode {
    let content = if file == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        fs::read_to_string(file)
    };
    let content = match content {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {}", file, e);
            return ExitCode::FAILURE;
        }
    };

    let inputs: Vec<FieldInput> = match serde_json::from_str(&content) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Invalid batch input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let compiler = match FormulaCompiler::from_settings(settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let translations = compiler.compile_batch(&inputs);
    let failed = translations.iter().filter(|t| !t.is_success()).count();
    if failed > 0 {
        log::warn!("{} of {} formulas need manual migration", failed, translations.len());
    }

    print_json(&translations, pretty)
}

fn cmd_functions(settings: &Settings, category: Option<CategoryArg>) -> ExitCode {
    let registry = match settings.registry() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let filter: Option<FunctionCategory> = category.map(Into::into);

    let mut specs: Vec<&FunctionSpec> = registry
        .iter()
        .filter(|spec| filter.map_or(true, |c| spec.category == c))
        .collect();
    specs.sort_by_key(|spec| spec.category);

    let mut current = None;
    for spec in specs {
        if current != Some(spec.category) {
            if current.is_some() {
                println!();
            }
            println!("{}:", spec.category);
            current = Some(spec.category);
        }
        let mut flags = Vec::new();
        if spec.aggregate {
            flags.push("aggregate");
        }
        if !spec.deterministic {
            flags.push("non-deterministic");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", flags.join(", "))
        };
        println!(
            "  {:<12} args {:<5} -> {}{}",
            spec.name,
            spec.arity_label(),
            describe_rule(&spec.rule),
            flags
        );
    }

    ExitCode::SUCCESS
}

fn describe_rule(rule: &SqlRule) -> String {
    match rule {
        SqlRule::Rename(name) => format!("{}(...)", name),
        SqlRule::Template(template) => template.clone(),
        SqlRule::Percentile => "PERCENTILE_CONT({0}, {1})".to_string(),
        SqlRule::DateAdd => "DATE_ADD({2}, INTERVAL {1} <unit>)".to_string(),
        SqlRule::DateDiff => "DATE_DIFF({2}, {1}, <unit>)".to_string(),
        SqlRule::DateTrunc => "DATE_TRUNC({1}, <unit>)".to_string(),
        SqlRule::DatePart => "EXTRACT(<unit> FROM {1})".to_string(),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> ExitCode {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print a diagnostic pointing at the failing part of the formula.
fn report_error(formula: &str, error: &FormulaError) {
    let Some(position) = error.position() else {
        eprintln!("Compilation error: {}", error);
        return;
    };

    // ariadne spans count characters, positions count bytes
    let byte = position.min(formula.len());
    let start = formula
        .char_indices()
        .take_while(|(i, _)| *i < byte)
        .count();
    let end = if byte < formula.len() { start + 1 } else { start };

    let printed = Report::build(ReportKind::Error, ("formula", start..end))
        .with_message(error.to_string())
        .with_label(Label::new(("formula", start..end)).with_message(error.kind()))
        .finish()
        .eprint(("formula", Source::from(formula.to_string())));

    if printed.is_err() {
        eprintln!("Compilation error: {}", error);
    }
}
