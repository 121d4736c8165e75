//! Integration tests for formula analysis.

use lookml_calc::analysis::{
    extract_dependencies, measure, Complexity, ComplexityPolicy, FormulaAnalyzer, Metrics,
};
use lookml_calc::formula::{parse_formula, DataType};
use lookml_calc::sql::FunctionRegistry;

fn analyze(formula: &str) -> lookml_calc::analysis::Analysis {
    let registry = FunctionRegistry::builtin();
    FormulaAnalyzer::new(&registry).analyze(&parse_formula(formula).unwrap())
}

fn deps(formula: &str) -> Vec<String> {
    extract_dependencies(&parse_formula(formula).unwrap())
        .into_iter()
        .collect()
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_dependencies_are_deduplicated_and_sorted() {
    assert_eq!(
        deps("[sales] + [Cost] * [sales] - [cost]"),
        vec!["cost".to_string(), "sales".to_string()]
    );
}

#[test]
fn test_dependencies_from_every_position() {
    let formula = "CASE [region] WHEN [home] THEN SUM([a]) ELSE IF [flag] THEN [b] ELSE -[c] END END";
    assert_eq!(
        deps(formula),
        vec!["a", "b", "c", "flag", "home", "region"]
    );
}

#[test]
fn test_literal_formula_has_no_dependencies() {
    assert!(deps("1 + 2").is_empty());
    assert!(deps("NOW()").is_empty());
}

// ============================================================================
// Metrics and complexity
// ============================================================================

#[test]
fn test_metrics_of_nested_conditional() {
    let node = parse_formula(r#"IF [revenue] > [budget] * 2 THEN "Success" ELSE "Fail" END"#).unwrap();
    assert_eq!(
        measure(&node),
        Metrics {
            depth: 4,
            node_count: 8,
            function_count: 0,
            conditional_count: 1,
        }
    );
}

#[test]
fn test_observed_simple_formulas() {
    assert_eq!(analyze("[sales]").complexity, Complexity::Simple);
    assert_eq!(analyze("[sales] * 2").complexity, Complexity::Simple);
    assert_eq!(
        analyze("IF [a] > 0 THEN 'pos' ELSE 'neg' END").complexity,
        Complexity::Simple
    );
    assert_eq!(
        analyze(r#"IF [revenue] > [budget] * 2 THEN "Success" ELSE "Fail" END"#).complexity,
        Complexity::Simple
    );
}

#[test]
fn test_medium_formula() {
    let analysis = analyze("IF [a] > 0 THEN ([b] + [c]) * ([d] - 1) ELSE 0 END");
    assert_eq!(analysis.metrics.depth, 4);
    assert_eq!(analysis.metrics.node_count, 12);
    assert_eq!(analysis.complexity, Complexity::Medium);
}

#[test]
fn test_complex_formula() {
    let formula = "IF [a] > 0 THEN IF [b] > 0 THEN IF [c] > 0 THEN IF [d] > 0 THEN ROUND(([e] + 1) * 2) ELSE 0 END ELSE 0 END ELSE 0 END ELSE 0 END";
    let analysis = analyze(formula);
    assert!(analysis.metrics.depth > 7);
    assert_eq!(analysis.metrics.conditional_count, 4);
    assert_eq!(analysis.metrics.function_count, 1);
    assert_eq!(analysis.complexity, Complexity::Complex);
}

#[test]
fn test_custom_policy() {
    let registry = FunctionRegistry::builtin();
    let strict = ComplexityPolicy {
        simple_max_depth: 2,
        simple_max_nodes: 5,
        medium_max_depth: 3,
        medium_max_nodes: 8,
    };
    let analyzer = FormulaAnalyzer::new(&registry).with_policy(strict);

    let classify = |f: &str| analyzer.analyze(&parse_formula(f).unwrap()).complexity;
    assert_eq!(classify("[a] + 1"), Complexity::Simple);
    assert_eq!(classify("[a] + 1 > 2"), Complexity::Medium);
    assert_eq!(classify("([a] + 1) * 2 > 3"), Complexity::Complex);
}

// ============================================================================
// Flags and warnings
// ============================================================================

#[test]
fn test_requires_aggregation() {
    assert!(analyze("SUM([a]) / COUNTD([b])").requires_aggregation);
    assert!(analyze("IF [a] THEN PERCENTILE([b], 0.9) ELSE 0 END").requires_aggregation);
    assert!(!analyze("UPPER([name])").requires_aggregation);
}

#[test]
fn test_non_deterministic_functions() {
    assert!(!analyze("RANDOM() * 10").is_deterministic);
    assert!(!analyze("NOW()").is_deterministic);
    assert!(analyze("ABS([a])").is_deterministic);
}

#[test]
fn test_inferred_data_type() {
    assert_eq!(analyze("[a] + [b]").data_type, DataType::Unknown);
    assert_eq!(analyze("LEN([name]) * 2").data_type, DataType::Integer);
    assert_eq!(analyze("NOT [flag]").data_type, DataType::Boolean);
    assert_eq!(analyze("TODAY()").data_type, DataType::Date);
    assert_eq!(analyze("IF [a] THEN 'x' ELSE 1 END").data_type, DataType::Unknown);
}

#[test]
fn test_arity_mismatch_becomes_warning() {
    let analysis = analyze("LEFT([name])");
    assert_eq!(
        analysis.warnings(),
        vec!["Function 'LEFT' expects 2 argument(s), found 1".to_string()]
    );
}

#[test]
fn test_well_formed_formula_has_no_warnings() {
    assert!(analyze("IFNULL([a], 0) + ZN([b])").warnings().is_empty());
}
