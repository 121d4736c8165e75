//! Table-driven function registry.
//!
//! Maps Tableau function names to SQL rendering rules plus the metadata the
//! analyzer needs (arity, aggregation, determinism, result type). Adding a
//! function is a matter of adding a row; the code generator has no
//! per-function branching.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::formula::DataType;

// =============================================================================
// Rendering Rules
// =============================================================================

/// How a function call is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlRule {
    /// `SQL_NAME(arg0, arg1, ...)`
    Rename(String),
    /// Text with `{0}`, `{1}`, ... argument slots.
    Template(String),
    /// `PERCENTILE_CONT(expr, fraction)`; fraction must be a numeric literal in `[0, 1]`.
    Percentile,
    /// `DATEADD('unit', n, date)`
    DateAdd,
    /// `DATEDIFF('unit', start, end)`
    DateDiff,
    /// `DATETRUNC('unit', date)`
    DateTrunc,
    /// `DATEPART('unit', date)`
    DatePart,
}

/// Unit named by the first argument of the date-unit functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateUnit {
    /// Parse a unit name, ignoring case.
    pub fn parse(name: &str) -> Option<DateUnit> {
        let unit = match name.trim().to_ascii_lowercase().as_str() {
            "year" => DateUnit::Year,
            "quarter" => DateUnit::Quarter,
            "month" => DateUnit::Month,
            "week" => DateUnit::Week,
            "day" => DateUnit::Day,
            "hour" => DateUnit::Hour,
            "minute" => DateUnit::Minute,
            "second" => DateUnit::Second,
            _ => return None,
        };
        Some(unit)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            DateUnit::Year => "YEAR",
            DateUnit::Quarter => "QUARTER",
            DateUnit::Month => "MONTH",
            DateUnit::Week => "WEEK",
            DateUnit::Day => "DAY",
            DateUnit::Hour => "HOUR",
            DateUnit::Minute => "MINUTE",
            DateUnit::Second => "SECOND",
        }
    }

    /// Sub-day units need the DATETIME_* function family.
    pub fn is_time_of_day(&self) -> bool {
        matches!(self, DateUnit::Hour | DateUnit::Minute | DateUnit::Second)
    }
}

// =============================================================================
// Function Metadata
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCategory {
    Aggregate,
    String,
    Math,
    Date,
    Conversion,
    Logical,
    Other,
}

impl FunctionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionCategory::Aggregate => "aggregate",
            FunctionCategory::String => "string",
            FunctionCategory::Math => "math",
            FunctionCategory::Date => "date",
            FunctionCategory::Conversion => "conversion",
            FunctionCategory::Logical => "logical",
            FunctionCategory::Other => "other",
        }
    }

    pub fn parse(name: &str) -> Option<FunctionCategory> {
        let category = match name.to_ascii_lowercase().as_str() {
            "aggregate" => FunctionCategory::Aggregate,
            "string" => FunctionCategory::String,
            "math" => FunctionCategory::Math,
            "date" => FunctionCategory::Date,
            "conversion" => FunctionCategory::Conversion,
            "logical" => FunctionCategory::Logical,
            "other" => FunctionCategory::Other,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registry row.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    /// Upper-case Tableau name.
    pub name: String,
    pub category: FunctionCategory,
    pub rule: SqlRule,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    pub aggregate: bool,
    pub deterministic: bool,
    pub return_type: DataType,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, category: FunctionCategory, rule: SqlRule) -> Self {
        Self {
            name: name.into().to_uppercase(),
            category,
            rule,
            min_args: 0,
            max_args: None,
            aggregate: false,
            deterministic: true,
            return_type: DataType::Unknown,
        }
    }

    /// Function rendered under a (possibly identical) SQL name.
    pub fn rename(name: &str, sql_name: &str, category: FunctionCategory) -> Self {
        Self::new(name, category, SqlRule::Rename(sql_name.to_string()))
    }

    /// Function rendered from a `{n}`-slot template.
    pub fn template(name: &str, template: &str, category: FunctionCategory) -> Self {
        Self::new(name, category, SqlRule::Template(template.to_string()))
    }

    pub fn args(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_args = min;
        self.max_args = max;
        self
    }

    /// Exactly `n` arguments.
    pub fn arity(self, n: usize) -> Self {
        self.args(n, Some(n))
    }

    pub fn aggregate(mut self) -> Self {
        self.aggregate = true;
        self
    }

    pub fn non_deterministic(mut self) -> Self {
        self.deterministic = false;
        self
    }

    pub fn returns(mut self, data_type: DataType) -> Self {
        self.return_type = data_type;
        self
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Human-readable arity, e.g. `1`, `2..3`, `1+`.
    pub fn arity_label(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("{}+", self.min_args),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

static BUILTIN: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::builtin);

/// The shared built-in registry.
pub fn builtin_registry() -> &'static FunctionRegistry {
    &BUILTIN
}

/// Name-to-rule table consulted by the analyzer and the code generator.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    /// A registry with no functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert or replace a function.
    pub fn register(&mut self, spec: FunctionSpec) {
        self.functions.insert(spec.name.clone(), spec);
    }

    /// Look up a function, ignoring case.
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All functions, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn in_category(&self, category: FunctionCategory) -> impl Iterator<Item = &FunctionSpec> {
        self.iter().filter(move |spec| spec.category == category)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The built-in Tableau function table.
    pub fn builtin() -> Self {
        use DataType as T;
        use FunctionCategory::*;

        let mut registry = Self::empty();
        let mut add = |spec: FunctionSpec| registry.register(spec);

        // Aggregates
        add(FunctionSpec::rename("SUM", "SUM", Aggregate).arity(1).aggregate().returns(T::Real));
        add(FunctionSpec::rename("AVG", "AVG", Aggregate).arity(1).aggregate().returns(T::Real));
        add(FunctionSpec::rename("MIN", "MIN", Aggregate).arity(1).aggregate());
        add(FunctionSpec::rename("MAX", "MAX", Aggregate).arity(1).aggregate());
        add(FunctionSpec::rename("COUNT", "COUNT", Aggregate).arity(1).aggregate().returns(T::Integer));
        add(FunctionSpec::template("COUNTD", "COUNT(DISTINCT {0})", Aggregate)
            .arity(1)
            .aggregate()
            .returns(T::Integer));
        add(FunctionSpec::rename("MEDIAN", "MEDIAN", Aggregate).arity(1).aggregate().returns(T::Real));
        for (name, sql_name) in [
            ("STDEV", "STDDEV_SAMP"),
            ("STDEVP", "STDDEV_POP"),
            ("VAR", "VAR_SAMP"),
            ("VARP", "VAR_POP"),
        ] {
            add(FunctionSpec::rename(name, sql_name, Aggregate).arity(1).aggregate().returns(T::Real));
        }
        for (name, sql_name) in [("CORR", "CORR"), ("COVAR", "COVAR_SAMP"), ("COVARP", "COVAR_POP")] {
            add(FunctionSpec::rename(name, sql_name, Aggregate).arity(2).aggregate().returns(T::Real));
        }
        add(FunctionSpec::new("PERCENTILE", Aggregate, SqlRule::Percentile)
            .arity(2)
            .aggregate()
            .returns(T::Real));

        // Strings
        for name in ["UPPER", "LOWER", "TRIM", "LTRIM", "RTRIM"] {
            add(FunctionSpec::rename(name, name, String).arity(1).returns(T::String));
        }
        add(FunctionSpec::rename("LEFT", "LEFT", String).arity(2).returns(T::String));
        add(FunctionSpec::rename("RIGHT", "RIGHT", String).arity(2).returns(T::String));
        add(FunctionSpec::rename("REPLACE", "REPLACE", String).arity(3).returns(T::String));
        add(FunctionSpec::rename("ASCII", "ASCII", String).arity(1).returns(T::Integer));
        add(FunctionSpec::rename("LEN", "LENGTH", String).arity(1).returns(T::Integer));
        add(FunctionSpec::rename("MID", "SUBSTR", String).args(2, Some(3)).returns(T::String));
        add(FunctionSpec::rename("CHAR", "CHR", String).arity(1).returns(T::String));
        add(FunctionSpec::rename("PROPER", "INITCAP", String).arity(1).returns(T::String));
        add(FunctionSpec::template("CONTAINS", "(STRPOS({0}, {1}) > 0)", String)
            .arity(2)
            .returns(T::Boolean));
        add(FunctionSpec::rename("STARTSWITH", "STARTS_WITH", String).arity(2).returns(T::Boolean));
        add(FunctionSpec::rename("ENDSWITH", "ENDS_WITH", String).arity(2).returns(T::Boolean));
        add(FunctionSpec::rename("FIND", "STRPOS", String).arity(2).returns(T::Integer));

        // Math
        for name in ["ABS", "SQRT", "EXP", "LN", "SIN", "COS", "TAN", "ASIN", "ACOS", "ATAN"] {
            add(FunctionSpec::rename(name, name, Math).arity(1).returns(T::Real));
        }
        add(FunctionSpec::rename("ROUND", "ROUND", Math).args(1, Some(2)).returns(T::Real));
        add(FunctionSpec::rename("FLOOR", "FLOOR", Math).arity(1).returns(T::Integer));
        add(FunctionSpec::rename("CEILING", "CEIL", Math).arity(1).returns(T::Integer));
        add(FunctionSpec::rename("SIGN", "SIGN", Math).arity(1).returns(T::Integer));
        add(FunctionSpec::rename("LOG", "LOG", Math).args(1, Some(2)).returns(T::Real));
        add(FunctionSpec::rename("DIV", "DIV", Math).arity(2).returns(T::Integer));
        add(FunctionSpec::rename("POWER", "POW", Math).arity(2).returns(T::Real));
        add(FunctionSpec::template("SQUARE", "POW({0}, 2)", Math).arity(1).returns(T::Real));
        add(FunctionSpec::template("PI", "ACOS(-1)", Math).arity(0).returns(T::Real));

        // Dates
        for part in ["YEAR", "QUARTER", "MONTH", "WEEK", "DAY"] {
            let template = format!("EXTRACT({} FROM {{0}})", part);
            add(FunctionSpec::template(part, &template, Date).arity(1).returns(T::Integer));
        }
        add(FunctionSpec::template("NOW", "CURRENT_TIMESTAMP()", Date)
            .arity(0)
            .non_deterministic()
            .returns(T::Datetime));
        add(FunctionSpec::template("TODAY", "CURRENT_DATE()", Date)
            .arity(0)
            .non_deterministic()
            .returns(T::Date));
        add(FunctionSpec::new("DATEADD", Date, SqlRule::DateAdd).arity(3).returns(T::Datetime));
        add(FunctionSpec::new("DATEDIFF", Date, SqlRule::DateDiff).arity(3).returns(T::Integer));
        add(FunctionSpec::new("DATETRUNC", Date, SqlRule::DateTrunc).arity(2).returns(T::Datetime));
        add(FunctionSpec::new("DATEPART", Date, SqlRule::DatePart).arity(2).returns(T::Integer));

        // Conversions
        add(FunctionSpec::template("FLOAT", "CAST({0} AS FLOAT64)", Conversion).arity(1).returns(T::Real));
        add(FunctionSpec::template("INT", "CAST({0} AS INT64)", Conversion).arity(1).returns(T::Integer));
        add(FunctionSpec::template("STR", "CAST({0} AS STRING)", Conversion).arity(1).returns(T::String));
        add(FunctionSpec::rename("DATE", "DATE", Conversion).arity(1).returns(T::Date));
        add(FunctionSpec::rename("DATETIME", "DATETIME", Conversion).arity(1).returns(T::Datetime));

        // Null handling
        add(FunctionSpec::rename("IFNULL", "IFNULL", Logical).arity(2));
        add(FunctionSpec::template("ISNULL", "({0} IS NULL)", Logical).arity(1).returns(T::Boolean));
        add(FunctionSpec::template("ZN", "IFNULL({0}, 0)", Logical).arity(1).returns(T::Real));

        add(FunctionSpec::template("RANDOM", "RAND()", Other)
            .arity(0)
            .non_deterministic()
            .returns(T::Real));

        registry
    }
}
