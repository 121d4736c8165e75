//! Integration tests for the formula parser.

use lookml_calc::formula::{
    parse_formula, tokenize, ArithmeticOp, ComparisonOp, FormulaError, LogicalOp, Node, Parser,
    UnaryOp, WhenClause,
};

fn parse(formula: &str) -> Node {
    parse_formula(formula).unwrap()
}

fn parse_err(formula: &str) -> FormulaError {
    parse_formula(formula).unwrap_err()
}

// ============================================================================
// Precedence and associativity
// ============================================================================

#[test]
fn test_comparison_binds_looser_than_arithmetic() {
    assert_eq!(
        parse("[revenue] > [budget] * 2"),
        Node::comparison(
            Node::field("revenue"),
            ComparisonOp::Gt,
            Node::arithmetic(Node::field("budget"), ArithmeticOp::Multiply, Node::int(2)),
        )
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(
        parse("[a] OR [b] AND [c]"),
        Node::logical(
            Node::field("a"),
            LogicalOp::Or,
            Node::logical(Node::field("b"), LogicalOp::And, Node::field("c")),
        )
    );
}

#[test]
fn test_comparison_binds_tighter_than_and() {
    assert_eq!(
        parse("[a] > 1 AND [b] <= 2"),
        Node::logical(
            Node::comparison(Node::field("a"), ComparisonOp::Gt, Node::int(1)),
            LogicalOp::And,
            Node::comparison(Node::field("b"), ComparisonOp::LtEq, Node::int(2)),
        )
    );
}

#[test]
fn test_division_and_modulo_are_left_associative() {
    assert_eq!(
        parse("100 / 10 % 3"),
        Node::arithmetic(
            Node::arithmetic(Node::int(100), ArithmeticOp::Divide, Node::int(10)),
            ArithmeticOp::Modulo,
            Node::int(3),
        )
    );
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(
        parse("(2 + 3) * 4"),
        Node::arithmetic(
            Node::arithmetic(Node::int(2), ArithmeticOp::Add, Node::int(3)),
            ArithmeticOp::Multiply,
            Node::int(4),
        )
    );
}

#[test]
fn test_not_applies_to_next_operand_only() {
    assert_eq!(
        parse("NOT [a] AND [b]"),
        Node::logical(
            Node::unary(UnaryOp::Not, Node::field("a")),
            LogicalOp::And,
            Node::field("b"),
        )
    );
}

#[test]
fn test_bang_equals_is_not_equal() {
    assert_eq!(parse("[a] != 1"), parse("[a] <> 1"));
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_literal_types() {
    assert_eq!(parse("42"), Node::int(42));
    assert_eq!(parse("4.5"), Node::real(4.5));
    assert_eq!(parse("'x'"), Node::string("x"));
    assert_eq!(parse("true"), Node::boolean(true));
    assert_eq!(parse("FALSE"), Node::boolean(false));
    assert_eq!(parse("Null"), Node::null());
}

// ============================================================================
// Conditionals and CASE
// ============================================================================

#[test]
fn test_conditional() {
    assert_eq!(
        parse(r#"IF [revenue] > [budget] * 2 THEN "Success" ELSE "Fail" END"#),
        Node::conditional(
            Node::comparison(
                Node::field("revenue"),
                ComparisonOp::Gt,
                Node::arithmetic(Node::field("budget"), ArithmeticOp::Multiply, Node::int(2)),
            ),
            Node::string("Success"),
            Node::string("Fail"),
        )
    );
}

#[test]
fn test_conditional_as_operand() {
    let node = parse("1 + IF [a] THEN 2 ELSE 3 END");
    assert!(matches!(
        node,
        Node::Arithmetic {
            operator: ArithmeticOp::Add,
            ..
        }
    ));
}

#[test]
fn test_searched_case() {
    assert_eq!(
        parse(r#"CASE WHEN [sales] > 1000 THEN "High" WHEN [sales] > 500 THEN "Medium" ELSE "Low" END"#),
        Node::searched_case(
            vec![
                WhenClause::new(
                    Node::comparison(Node::field("sales"), ComparisonOp::Gt, Node::int(1000)),
                    Node::string("High"),
                ),
                WhenClause::new(
                    Node::comparison(Node::field("sales"), ComparisonOp::Gt, Node::int(500)),
                    Node::string("Medium"),
                ),
            ],
            Some(Node::string("Low")),
        )
    );
}

#[test]
fn test_simple_case_without_else() {
    assert_eq!(
        parse("CASE [region] WHEN 'EU' THEN 1 WHEN 'US' THEN 2 END"),
        Node::simple_case(
            Node::field("region"),
            vec![
                WhenClause::new(Node::string("EU"), Node::int(1)),
                WhenClause::new(Node::string("US"), Node::int(2)),
            ],
            None,
        )
    );
}

#[test]
fn test_simple_case_accepts_expression_values() {
    let node = parse("CASE [a] + 1 WHEN [b] * 2 THEN 'x' END");
    match node {
        Node::Case {
            case_expression: Some(expr),
            when_clauses,
            else_branch: None,
        } => {
            assert!(matches!(*expr, Node::Arithmetic { .. }));
            assert!(matches!(when_clauses[0].condition, Node::Arithmetic { .. }));
        }
        other => panic!("expected simple CASE, got {:?}", other),
    }
}

// ============================================================================
// Function calls
// ============================================================================

#[test]
fn test_function_name_is_uppercased() {
    assert_eq!(
        parse("sum([sales])"),
        Node::function("SUM", vec![Node::field("sales")])
    );
}

#[test]
fn test_function_with_no_arguments() {
    assert_eq!(parse("NOW()"), Node::function("NOW", vec![]));
}

#[test]
fn test_nested_function_arguments() {
    assert_eq!(
        parse("ROUND(SUM([a]) / 2, 1)"),
        Node::function(
            "ROUND",
            vec![
                Node::arithmetic(
                    Node::function("SUM", vec![Node::field("a")]),
                    ArithmeticOp::Divide,
                    Node::int(2),
                ),
                Node::int(1),
            ],
        )
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_formula() {
    assert_eq!(parse_err(""), FormulaError::EmptyFormula);
    assert_eq!(parse_err("   "), FormulaError::EmptyFormula);
}

#[test]
fn test_missing_then() {
    assert!(matches!(
        parse_err("IF [a] 1 ELSE 2 END"),
        FormulaError::MissingKeyword { keyword: "THEN", .. }
    ));
}

#[test]
fn test_missing_end() {
    assert!(matches!(
        parse_err("IF [a] THEN 1 ELSE 2"),
        FormulaError::MissingKeyword { keyword: "END", .. }
    ));
    assert!(matches!(
        parse_err("CASE WHEN [a] THEN 1"),
        FormulaError::MissingKeyword { keyword: "END", .. }
    ));
}

#[test]
fn test_case_without_when() {
    assert!(matches!(
        parse_err("CASE [a] ELSE 1 END"),
        FormulaError::MissingKeyword { keyword: "WHEN", .. }
    ));
}

#[test]
fn test_unbalanced_parentheses() {
    assert_eq!(
        parse_err("SUM([a]"),
        FormulaError::UnbalancedParens { position: 3 }
    );
    assert!(matches!(
        parse_err("(1 + 2))"),
        FormulaError::UnexpectedToken { position: 7, .. }
    ));
}

#[test]
fn test_empty_argument() {
    assert_eq!(
        parse_err("IFNULL([a], )"),
        FormulaError::EmptyArgument {
            function: "IFNULL".to_string(),
            position: 12,
        }
    );
    assert!(matches!(
        parse_err("MAX(, [a])"),
        FormulaError::EmptyArgument { .. }
    ));
}

#[test]
fn test_dangling_operator() {
    assert!(matches!(
        parse_err("[a] +"),
        FormulaError::UnexpectedToken { position: 5, .. }
    ));
}

#[test]
fn test_error_messages_are_descriptive() {
    let message = parse_err("IF [a] THEN 1 END").to_string();
    assert_eq!(message, "Missing 'ELSE': found 'END' at position 14");
}

// ============================================================================
// Depth
// ============================================================================

#[test]
fn test_deep_nesting_within_limit() {
    let formula = "IF [a] > 1 THEN (([b] + 1) * (IF [c] THEN 2 ELSE 3 END)) - 4 ELSE ABS(-([d] / 2)) END";
    assert!(parse_formula(formula).is_ok());
}

#[test]
fn test_depth_limit_is_reported() {
    let formula = format!("{}[a]", "-".repeat(100));
    let err = Parser::new(tokenize(&formula).unwrap())
        .with_max_depth(32)
        .parse()
        .unwrap_err();
    assert_eq!(
        err,
        FormulaError::DepthLimitExceeded {
            limit: 32,
            position: 32
        }
    );
}

#[test]
fn test_pathological_nesting_does_not_overflow() {
    let formula = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(matches!(
        parse_formula(&formula),
        Err(FormulaError::DepthLimitExceeded { limit: 64, .. })
    ));
}

#[test]
fn test_flat_chain_exceeds_depth_limit() {
    let formula = format!("[a]{}", " + 1".repeat(9_999));
    // the 64th `+` sits at byte 256 and makes the tree 65 deep
    assert_eq!(
        parse_err(&formula),
        FormulaError::DepthLimitExceeded {
            limit: 64,
            position: 256
        }
    );
}

#[test]
fn test_flat_chain_within_limit() {
    let formula = format!("[a]{}", " * 2".repeat(60));
    assert_eq!(parse(&formula).depth(), 61);
}

#[test]
fn test_chain_inside_conditional_counts_enclosing_depth() {
    let chain = format!("1{}", " + 1".repeat(63));
    assert!(parse_formula(&chain).is_ok());
    assert!(matches!(
        parse_formula(&format!("IF [a] THEN {} ELSE 0 END", chain)),
        Err(FormulaError::DepthLimitExceeded { limit: 64, .. })
    ));
}

#[test]
fn test_wide_case_within_limit() {
    let whens: String = (0..5_000)
        .map(|i| format!(" WHEN [a] = {} THEN 'v{}'", i, i))
        .collect();
    let node = parse(&format!("CASE{} ELSE 'other' END", whens));
    match &node {
        Node::Case { when_clauses, .. } => assert_eq!(when_clauses.len(), 5_000),
        other => panic!("expected CASE, got {:?}", other),
    }
    assert_eq!(node.depth(), 3);
}

#[test]
fn test_long_argument_list_within_limit() {
    let args = vec!["[a]"; 2_000].join(", ");
    let node = parse(&format!("GREATEST({})", args));
    assert_eq!(node.children().len(), 2_000);
    assert_eq!(node.depth(), 2);
}

