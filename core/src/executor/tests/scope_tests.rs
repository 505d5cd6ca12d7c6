//! Tests for lexical scoping and the persistent top-level scope

use super::helpers::{eval, interpreter, output, run_err};
use crate::errors::ErrorKind;
use crate::executor::Val;

#[test]
fn test_function_local_shadows_global() {
    let source = r#"
var x = 1;
func f() { var x = 2; return x; }
print(f(), x);
"#;
    assert_eq!(output(source), "2 1\n");
}

#[test]
fn test_block_declarations_stay_in_block() {
    assert_eq!(eval("var x = 1; { var x = 2; } x"), Val::Int(1));
}

#[test]
fn test_assignment_updates_enclosing_binding() {
    assert_eq!(eval("var x = 1; { x = 5; } x"), Val::Int(5));
    assert_eq!(
        eval("var total = 0; func add(n) { total += n; } add(3); add(4); total"),
        Val::Int(7)
    );
}

#[test]
fn test_parameters_shadow_outer_names() {
    assert_eq!(eval("var a = 1; func f(a) { return a; } f(9) + a"), Val::Int(10));
}

#[test]
fn test_missing_arguments_bind_nil_and_extras_are_ignored() {
    assert_eq!(eval("func f(a, b) { return b; } f(1)"), Val::Nil);
    assert_eq!(eval("func f(a) { return a; } f(1, 2, 3)"), Val::Int(1));
}

#[test]
fn test_assignment_to_undeclared_name() {
    let err = run_err("missing = 1");
    assert_eq!(err.kind, ErrorKind::UnresolvedIdentifier);
    assert_eq!(err.message, "'missing' is not defined");
}

#[test]
fn test_loop_binding_is_scoped_to_the_loop() {
    let err = run_err("for (var i in [1, 2]) {} i");
    assert_eq!(err.kind, ErrorKind::UnresolvedIdentifier);
    assert_eq!(err.message, "'i' is not defined");
}

#[test]
fn test_each_iteration_gets_a_fresh_binding() {
    let source = r#"
var getters = [];
for (var i in [1, 2, 3]) {
    getters.push(func () { return i; });
}
getters[0]() + getters[2]()
"#;
    assert_eq!(eval(source), Val::Int(4));
}

#[test]
fn test_globals_persist_between_runs() {
    let mut interp = interpreter();
    interp.run_source("var counter = 1;", None).unwrap();
    interp.run_source("counter += 1;", None).unwrap();

    assert_eq!(interp.run_source("counter", None).unwrap(), Val::Int(2));
    assert_eq!(interp.lookup_global("counter"), Some(Val::Int(2)));
}

#[test]
fn test_reset_forgets_bindings() {
    let mut interp = interpreter();
    interp.run_source("var counter = 1;", None).unwrap();
    interp.reset();

    assert_eq!(interp.lookup_global("counter"), None);
    let err = interp.run_source("counter", None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedIdentifier);

    // The prelude is reinstalled
    assert!(interp.lookup_global("print").is_some());
}

#[test]
fn test_prelude_names_can_be_shadowed() {
    assert_eq!(eval("var len = 3; len"), Val::Int(3));
    // A fresh interpreter still has the original
    assert_eq!(eval(r#"len("abc")"#), Val::Int(3));
}
