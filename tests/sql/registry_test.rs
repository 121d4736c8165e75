//! Tests for the built-in function registry.

use lookml_calc::formula::DataType;
use lookml_calc::sql::{
    builtin_registry, FunctionCategory, FunctionRegistry, FunctionSpec, SqlRule,
};

#[test]
fn test_builtin_covers_core_categories() {
    let registry = builtin_registry();

    for name in ["SUM", "AVG", "COUNT", "COUNTD", "MIN", "MAX", "MEDIAN"] {
        let spec = registry.get(name).unwrap();
        assert_eq!(spec.category, FunctionCategory::Aggregate, "{}", name);
        assert!(spec.aggregate, "{} should aggregate", name);
    }
    for name in ["UPPER", "LOWER", "LEN", "LEFT", "RIGHT", "MID", "TRIM", "CONTAINS"] {
        assert_eq!(registry.get(name).unwrap().category, FunctionCategory::String);
    }
    for name in ["ABS", "ROUND", "FLOOR", "CEILING", "POWER", "SQRT"] {
        assert_eq!(registry.get(name).unwrap().category, FunctionCategory::Math);
    }
    for name in ["YEAR", "MONTH", "DAY", "DATEADD", "DATEDIFF", "DATETRUNC", "NOW", "TODAY"] {
        assert_eq!(registry.get(name).unwrap().category, FunctionCategory::Date);
    }
    for name in ["IFNULL", "ISNULL", "ZN"] {
        assert_eq!(registry.get(name).unwrap().category, FunctionCategory::Logical);
    }
}

#[test]
fn test_non_aggregates_are_not_flagged() {
    let registry = builtin_registry();
    for spec in registry.iter() {
        if spec.category != FunctionCategory::Aggregate {
            assert!(!spec.aggregate, "{} should not aggregate", spec.name);
        }
    }
}

#[test]
fn test_non_deterministic_functions() {
    let mut names: Vec<&str> = builtin_registry()
        .iter()
        .filter(|spec| !spec.deterministic)
        .map(|spec| spec.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["NOW", "RANDOM", "TODAY"]);
}

#[test]
fn test_arity_bounds() {
    let registry = builtin_registry();

    let mid = registry.get("MID").unwrap();
    assert!(!mid.accepts_arity(1));
    assert!(mid.accepts_arity(2));
    assert!(mid.accepts_arity(3));
    assert!(!mid.accepts_arity(4));
    assert_eq!(mid.arity_label(), "2..3");

    let pi = registry.get("PI").unwrap();
    assert!(pi.accepts_arity(0));
    assert_eq!(pi.arity_label(), "0");

    let variadic = FunctionSpec::rename("COALESCE", "COALESCE", FunctionCategory::Logical)
        .args(1, None);
    assert!(variadic.accepts_arity(12));
    assert!(!variadic.accepts_arity(0));
    assert_eq!(variadic.arity_label(), "1+");
}

#[test]
fn test_rules_and_return_types() {
    let registry = builtin_registry();

    assert_eq!(
        registry.get("LEN").unwrap().rule,
        SqlRule::Rename("LENGTH".to_string())
    );
    assert_eq!(
        registry.get("COUNTD").unwrap().rule,
        SqlRule::Template("COUNT(DISTINCT {0})".to_string())
    );
    assert_eq!(registry.get("DATEDIFF").unwrap().rule, SqlRule::DateDiff);
    assert_eq!(registry.get("LEN").unwrap().return_type, DataType::Integer);
    assert_eq!(registry.get("TODAY").unwrap().return_type, DataType::Date);
    assert_eq!(registry.get("CONTAINS").unwrap().return_type, DataType::Boolean);
}

#[test]
fn test_in_category_is_name_ordered() {
    let names: Vec<&str> = builtin_registry()
        .in_category(FunctionCategory::Conversion)
        .map(|spec| spec.name.as_str())
        .collect();
    assert_eq!(names, vec!["DATE", "DATETIME", "FLOAT", "INT", "STR"]);
}

#[test]
fn test_custom_registry_starts_empty() {
    let mut registry = FunctionRegistry::empty();
    assert!(registry.is_empty());

    registry.register(
        FunctionSpec::rename("regexp_match", "REGEXP_CONTAINS", FunctionCategory::String)
            .arity(2)
            .returns(DataType::Boolean),
    );

    assert_eq!(registry.len(), 1);
    let spec = registry.get("Regexp_Match").unwrap();
    assert_eq!(spec.name, "REGEXP_MATCH");
    assert!(!builtin_registry().contains("REGEXP_MATCH"));
}

#[test]
fn test_category_names() {
    assert_eq!(FunctionCategory::parse("DATE"), Some(FunctionCategory::Date));
    assert_eq!(FunctionCategory::parse("spatial"), None);
    assert_eq!(FunctionCategory::Conversion.to_string(), "conversion");
}
