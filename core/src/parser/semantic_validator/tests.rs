//! Tests for the semantic validation system

use super::*;
use crate::parser::parse_program;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse source and validate, returning errors
fn validate(source: &str) -> Vec<ValidationError> {
    let program = parse_program(source).expect("Parse should succeed");
    validate_program(&program, source)
}

/// Check if errors contain a specific rule
fn has_rule(errors: &[ValidationError], rule_id: &str) -> bool {
    errors.iter().any(|e| e.rule_id == rule_id)
}

/// Get errors for a specific rule
fn for_rule<'a>(errors: &'a [ValidationError], rule_id: &str) -> Vec<&'a ValidationError> {
    errors.iter().filter(|e| e.rule_id == rule_id).collect()
}

// ============================================================================
// Control Flow Placement Tests
// ============================================================================

#[test]
fn test_top_level_return() {
    let source = "var x = 1;\nreturn x;";

    let errors = validate(source);
    let placement = for_rule(&errors, "control-flow-placement");
    assert_eq!(placement.len(), 1);
    assert_eq!(placement[0].message, "return outside function body");
    assert_eq!(placement[0].span.line(), 2);
    assert!(placement[0].is_error());
}

#[test]
fn test_return_inside_function_ok() {
    let source = r#"
func outer() {
    func inner() { return 5; }
    return inner();
}
outer();
"#;

    let errors = validate(source);
    assert!(errors.is_empty(), "unexpected: {:?}", errors);
}

#[test]
fn test_break_outside_loop() {
    let errors = validate("if (true) { break; }");
    let placement = for_rule(&errors, "control-flow-placement");
    assert_eq!(placement.len(), 1);
    assert_eq!(placement[0].message, "break outside loop body");
}

#[test]
fn test_continue_in_function_inside_loop() {
    // The loop belongs to the caller, not to the function
    let source = r#"
while (true) {
    var f = func () { continue; };
    break;
}
"#;

    let errors = validate(source);
    let placement = for_rule(&errors, "control-flow-placement");
    assert_eq!(placement.len(), 1);
    assert_eq!(placement[0].message, "continue outside loop body");
}

#[test]
fn test_break_in_nested_loop_ok() {
    let source = r#"
func scan(rows) {
    for (var row in rows) {
        while (true) {
            if (row) { break; }
            continue;
        }
    }
}
"#;

    let errors = validate(source);
    assert!(!has_rule(&errors, "control-flow-placement"));
}

#[test]
fn test_has_errors() {
    let source = "return 1;";
    let program = parse_program(source).unwrap();
    assert!(has_errors(&program, source));

    let source = "func f() { return 1; }";
    let program = parse_program(source).unwrap();
    assert!(!has_errors(&program, source));
}

// ============================================================================
// Unreachable Code Tests
// ============================================================================

#[test]
fn test_unreachable_after_return() {
    let source = r#"
func f() {
    return 1;
    print("never");
    print("also never");
}
"#;

    let errors = validate(source);
    let unreachable = for_rule(&errors, "unreachable-code");
    assert_eq!(unreachable.len(), 1, "only the first statement is reported");
    assert_eq!(unreachable[0].severity, Severity::Warning);
    assert_eq!(unreachable[0].message, "Unreachable code after return");
    assert_eq!(unreachable[0].span.line(), 4);
}

#[test]
fn test_branch_return_is_reachable() {
    let source = r#"
func f(x) {
    if (x) { return 1; }
    return 2;
}
"#;

    let errors = validate(source);
    assert!(!has_rule(&errors, "unreachable-code"));
}

#[test]
fn test_if_else_both_exit() {
    let source = r#"
while (true) {
    if (true) { break; } else { continue; }
    print("unreachable");
}
"#;

    let errors = validate(source);
    let unreachable = for_rule(&errors, "unreachable-code");
    assert_eq!(unreachable.len(), 1);
    assert_eq!(unreachable[0].message, "Unreachable code after if/else");
}

#[test]
fn test_unreachable_inside_function_expression() {
    let source = r#"
var handler = func () {
    return nil;
    var lost = 1;
};
"#;

    let errors = validate(source);
    assert!(has_rule(&errors, "unreachable-code"));
    assert!(!errors.iter().any(|e| e.is_error()));
}

#[test]
fn test_validator_lists_rules() {
    let ids: Vec<_> = Validator::new().rules().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["control-flow-placement", "unreachable-code"]);
}
