//! End-to-end coverage of the access-expression grammar: operator semantics,
//! the error taxonomy, and the shape of reduced trees.

use authex::engine::Argument;
use authex::{parse_expression, AccessContext, ExprError, Value};
use rstest::rstest;

fn known_identity() -> AccessContext {
    AccessContext::with_identity("user", ["group"])
}

#[rstest]
#[case::bare_user("user", true)]
#[case::other_user("user2", false)]
#[case::negated_user("!user", false)]
#[case::group_membership("@group", true)]
#[case::other_group("@group2", false)]
#[case::negated_other_group("!@group2", true)]
#[case::conjunction("user && @group", true)]
#[case::conjunction_with_negation("user && !@group", false)]
#[case::disjunction_left_false("user2 || @group", true)]
#[case::disjunction_all_false("user2 || @group2", false)]
#[case::comma_alias("user2, @group", true)]
#[case::parenthesized("(user || user2) && @group", true)]
#[case::negated_subexpression("!(user2 || @group2)", true)]
#[case::mixed_precedence("user2 && user || @group", true)]
fn test_evaluation_against_known_identity(#[case] expr: &str, #[case] expected: bool) {
    let root = parse_expression(expr).unwrap();
    assert_eq!(root.evaluate(&known_identity()).unwrap(), Value::Bool(expected));
}

#[test]
fn test_evaluation_is_idempotent() {
    let root = parse_expression("user && @group || !user2").unwrap();
    let ctx = known_identity();
    let first = root.evaluate(&ctx).unwrap();
    let second = root.evaluate(&ctx).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_and_blank_input_evaluate_to_empty() {
    for text in ["", "   "] {
        let root = parse_expression(text).unwrap();
        assert_eq!(root.evaluate(&known_identity()).unwrap(), Value::Empty);
    }
}

#[test]
fn test_quoted_literal_matches_user_with_spaces() {
    let ctx = AccessContext::with_identity("mary poppins", Vec::<String>::new());
    let root = parse_expression(r#""mary poppins""#).unwrap();
    assert_eq!(root.evaluate(&ctx).unwrap(), Value::Bool(true));
}

#[test]
fn test_simulated_identities_extend_the_context() {
    let mut ctx = known_identity();
    ctx.simulate_groups(["admin"]);
    let root = parse_expression("@admin").unwrap();
    assert_eq!(root.evaluate(&ctx).unwrap(), Value::Bool(true));
    ctx.clear_simulation();
    assert_eq!(root.evaluate(&ctx).unwrap(), Value::Bool(false));
}

// --- tree shape ---

#[test]
fn test_operator_chain_folds_into_one_node() {
    let root = parse_expression("a && b && c").unwrap();
    let Argument::Element(and) = &root.args()[0] else {
        panic!("expected an element at the root");
    };
    assert_eq!(and.name(), "And");
    assert_eq!(and.args().len(), 3);
}

#[test]
fn test_disjunction_binds_loosest() {
    let root = parse_expression("a && b || c").unwrap();
    let Argument::Element(or) = &root.args()[0] else {
        panic!("expected an element at the root");
    };
    assert_eq!(or.name(), "Or");
    assert_eq!(or.args().len(), 2);
    let Argument::Element(and) = &or.args()[0] else {
        panic!("expected a conjunction on the left");
    };
    assert_eq!(and.name(), "And");
}

#[test]
fn test_representation_is_stable_under_reparse() {
    let first = parse_expression("  user &&  ! @group ,x ")
        .unwrap()
        .representation()
        .unwrap();
    assert_eq!(first, "user&&!@group||x");
    let second = parse_expression(&first).unwrap().representation().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_tree_string_shows_nested_structure() {
    let tree = parse_expression("!@group").unwrap().tree_string().unwrap();
    assert_eq!(tree, "root\n  Not\n    InGroup\n      Literal\n        <LIT:group>\n");
}

// --- error taxonomy ---

#[test]
fn test_unknown_token_reports_codepoint_position() {
    assert_eq!(
        parse_expression("user | user").unwrap_err(),
        ExprError::UnknownToken {
            position: 5,
            snippet: "| us".to_string(),
        }
    );
    // Multi-byte leading literal still counts codepoints, not bytes.
    assert!(matches!(
        parse_expression("ü | x").unwrap_err(),
        ExprError::UnknownToken { position: 2, .. }
    ));
}

#[test]
fn test_unmatched_open_paren() {
    assert!(matches!(
        parse_expression("(user").unwrap_err(),
        ExprError::UnmatchedWrapper { element, position: 0, .. } if element == "SubExpr"
    ));
}

#[test]
fn test_stray_close_paren() {
    assert_eq!(
        parse_expression(")").unwrap_err(),
        ExprError::StrayToken {
            lexeme: ")".to_string(),
            position: 0,
        }
    );
}

#[rstest]
#[case::trailing_and("user &&")]
#[case::lone_group_operator("@")]
#[case::double_negation("!!user")]
fn test_operators_without_arguments(#[case] expr: &str) {
    assert!(matches!(
        parse_expression(expr).unwrap_err(),
        ExprError::NotEnoughArguments { .. }
    ));
}

#[test]
fn test_leading_infix_operator_is_a_stray_token() {
    // An infix run is only recognized after its first argument, so a leading
    // operator is never consumed.
    assert_eq!(
        parse_expression("&& user").unwrap_err(),
        ExprError::StrayToken {
            lexeme: "&&".to_string(),
            position: 0,
        }
    );
}

#[rstest]
#[case::empty_parens("()")]
#[case::group_of_subexpression("@(group)")]
#[case::adjacent_literals("user user")]
fn test_malformed_trees_fail_validation(#[case] expr: &str) {
    let root = parse_expression(expr).unwrap();
    assert!(matches!(
        root.ensure_well_formed(),
        Err(ExprError::MalformedExpression { .. })
    ));
    assert!(matches!(
        root.evaluate(&known_identity()),
        Err(ExprError::MalformedExpression { .. })
    ));
}

#[test]
fn test_sibling_paren_groups_are_rejected() {
    // Parentheses pair outermost-first, so two groups at the same level leave
    // the inner open token unmatched.
    assert!(matches!(
        parse_expression("(a) || (b)").unwrap_err(),
        ExprError::UnmatchedWrapper { .. }
    ));
}

#[test]
fn test_degenerate_nesting_exceeds_depth_limit() {
    let text = format!("{}user{}", "(".repeat(60), ")".repeat(60));
    assert_eq!(
        parse_expression(&text).unwrap_err(),
        ExprError::DepthLimitExceeded { limit: 50 }
    );
}

#[test]
fn test_custom_depth_limit_is_honored() {
    let grammar = authex::access_grammar();
    let text = format!("{}user{}", "(".repeat(10), ")".repeat(10));
    assert_eq!(
        grammar.parse_with_depth(&text, 5).unwrap_err(),
        ExprError::DepthLimitExceeded { limit: 5 }
    );
    assert!(grammar.parse_with_depth(&text, 20).is_ok());
}
