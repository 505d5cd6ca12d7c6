//! Parser tests - verify parsing and AST structure
//!
//! These tests do NOT execute the code - that's covered by the executor tests.

use super::*;
use crate::errors::ErrorKind;

/// Parse a program and return its only statement
fn parse_single(source: &str) -> Stmt {
    let program = parse(source).expect("Should parse");
    assert_eq!(program.body.len(), 1, "expected one statement: {:?}", program.body);
    (*program.body[0]).clone()
}

/// Parse `source` as an expression statement and return the expression
fn parse_expr(source: &str) -> Expr {
    match parse_single(source) {
        Stmt::Expr { expr, .. } => expr,
        other => panic!("Expected expression statement, got {:?}", other),
    }
}

/* ===================== Statements ===================== */

#[test]
fn test_parse_var_with_and_without_init() {
    let program = parse("var x = 42;\nvar y").expect("Should parse");
    match &*program.body[0] {
        Stmt::Var {
            name,
            init: Some(Expr::LitInt { v, .. }),
            name_span,
            ..
        } => {
            assert_eq!(name, "x");
            assert_eq!(*v, 42);
            assert_eq!(name_span.column(), 5);
        }
        other => panic!("Expected Var with LitInt, got {:?}", other),
    }
    match &*program.body[1] {
        Stmt::Var {
            name, init: None, ..
        } => assert_eq!(name, "y"),
        other => panic!("Expected Var without init, got {:?}", other),
    }
}

#[test]
fn test_parse_func_declaration() {
    match parse_single("func add(a, b) { return a + b; }") {
        Stmt::Func { decl, .. } => {
            assert_eq!(decl.name.as_deref(), Some("add"));
            assert_eq!(decl.params, vec!["a", "b"]);
            assert_eq!(decl.body.len(), 1);
            assert!(matches!(
                &*decl.body[0],
                Stmt::Return {
                    value: Some(Expr::Binary {
                        op: BinaryOp::Add,
                        ..
                    }),
                    ..
                }
            ));
        }
        other => panic!("Expected Func, got {:?}", other),
    }
}

#[test]
fn test_parse_duplicate_parameter() {
    let err = parse("func f(a, a) {}").unwrap_err();
    assert_eq!(err.message(), "Duplicate parameter 'a'");
    assert!(matches!(err, ParseError::BuildError(..)));
}

#[test]
fn test_parse_if_else() {
    match parse_single("if (x < 1) { y = 1; } else y = 2;") {
        Stmt::If {
            test: Expr::Binary { op, .. },
            then_s,
            else_s: Some(else_s),
            ..
        } => {
            assert_eq!(op, BinaryOp::Lt);
            assert!(matches!(&*then_s, Stmt::Block { body, .. } if body.len() == 1));
            assert!(matches!(&*else_s, Stmt::Assign { .. }));
        }
        other => panic!("Expected If/else, got {:?}", other),
    }
}

#[test]
fn test_parse_while_and_for() {
    assert!(matches!(
        parse_single("while (true) { break; }"),
        Stmt::While {
            test: Expr::LitBool { v: true, .. },
            ..
        }
    ));

    for source in ["for (var item in items) {}", "for (item in items) {}"] {
        match parse_single(source) {
            Stmt::ForIn {
                binding, iterable, ..
            } => {
                assert_eq!(binding, "item");
                assert!(matches!(iterable, Expr::Ident { ref name, .. } if name == "items"));
            }
            other => panic!("Expected ForIn, got {:?}", other),
        }
    }
}

#[test]
fn test_parse_import_forms() {
    let program = parse(
        r#"
import "os";
import "./lib/util.tempo" as util
from "acme:strings" import pad;
"#,
    )
    .expect("Should parse");

    let bindings: Vec<(String, ImportBinding)> = program
        .body
        .iter()
        .map(|stmt| match &**stmt {
            Stmt::Import {
                specifier, binding, ..
            } => (specifier.clone(), binding.clone()),
            other => panic!("Expected Import, got {:?}", other),
        })
        .collect();

    assert_eq!(
        bindings,
        vec![
            ("os".to_string(), ImportBinding::Module),
            (
                "./lib/util.tempo".to_string(),
                ImportBinding::Alias {
                    name: "util".to_string()
                }
            ),
            (
                "acme:strings".to_string(),
                ImportBinding::Export {
                    name: "pad".to_string()
                }
            ),
        ]
    );
}

#[test]
fn test_parse_assignment_paths_and_compound_ops() {
    match parse_single("config.items[0] += 2") {
        Stmt::Assign { var, path, op, .. } => {
            assert_eq!(var, "config");
            assert_eq!(op, AssignOp::Add);
            assert_eq!(path.len(), 2);
            assert!(matches!(&path[0], MemberAccess::Prop { property, .. } if property == "items"));
            assert!(matches!(
                &path[1],
                MemberAccess::Index {
                    expr: Expr::LitInt { v: 0, .. },
                    ..
                }
            ));
        }
        other => panic!("Expected Assign, got {:?}", other),
    }
}

#[test]
fn test_equality_is_not_assignment() {
    assert!(matches!(
        parse_expr("x == 1"),
        Expr::Binary {
            op: BinaryOp::Eq,
            ..
        }
    ));
}

#[test]
fn test_keyword_prefixed_identifiers() {
    let program = parse("var returned = 1; iffy(returned)").expect("Should parse");
    assert_eq!(program.body.len(), 2);
    assert!(matches!(&*program.body[1], Stmt::Expr { expr: Expr::Call { .. }, .. }));
}

/* ===================== Expressions ===================== */

#[test]
fn test_precedence() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    match parse_expr("1 + 2 * 3") {
        Expr::Binary {
            op: BinaryOp::Add,
            left,
            right,
            ..
        } => {
            assert!(matches!(*left, Expr::LitInt { v: 1, .. }));
            assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        }
        other => panic!("Expected Add at the root, got {:?}", other),
    }

    // a || b && c parses as a || (b && c)
    assert!(matches!(
        parse_expr("a || b && c"),
        Expr::Binary {
            op: BinaryOp::Or,
            ..
        }
    ));
}

#[test]
fn test_left_associativity() {
    // 10 - 4 - 3 parses as (10 - 4) - 3
    match parse_expr("10 - 4 - 3") {
        Expr::Binary { left, right, .. } => {
            assert!(matches!(
                *left,
                Expr::Binary {
                    op: BinaryOp::Sub,
                    ..
                }
            ));
            assert!(matches!(*right, Expr::LitInt { v: 3, .. }));
        }
        other => panic!("Expected Binary, got {:?}", other),
    }
}

#[test]
fn test_unary_operators() {
    assert!(matches!(
        parse_expr("-x"),
        Expr::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
    match parse_expr("!!ready") {
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
            ..
        } => assert!(matches!(
            *operand,
            Expr::Unary {
                op: UnaryOp::Not,
                ..
            }
        )),
        other => panic!("Expected nested Not, got {:?}", other),
    }
}

#[test]
fn test_postfix_chain() {
    // task.then(f)[0].value
    match parse_expr("task.then(f)[0].value") {
        Expr::Member {
            object, property, ..
        } => {
            assert_eq!(property, "value");
            match *object {
                Expr::Index { object, .. } => {
                    assert!(matches!(*object, Expr::Call { ref args, .. } if args.len() == 1));
                }
                other => panic!("Expected Index, got {:?}", other),
            }
        }
        other => panic!("Expected Member, got {:?}", other),
    }
}

#[test]
fn test_literals() {
    assert!(matches!(parse_expr("3.5"), Expr::LitFloat { v, .. } if v == 3.5));
    assert!(matches!(parse_expr("1e3"), Expr::LitFloat { v, .. } if v == 1000.0));
    assert!(matches!(parse_expr("nil"), Expr::LitNil { .. }));
    assert!(matches!(
        parse_expr(r#""a\tb""#),
        Expr::LitStr { ref v, .. } if v == "a\tb"
    ));
    assert!(matches!(
        parse_expr("[1, 2, 3,]"),
        Expr::LitList { ref elements, .. } if elements.len() == 3
    ));
}

#[test]
fn test_object_literal_with_shorthand() {
    // Parenthesized so the braces are not read as a block
    match parse_expr(r#"({name: "tempo", "quoted key": 1, version})"#) {
        Expr::LitObj { properties, .. } => {
            let keys: Vec<&str> = properties.iter().map(|(k, _, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["name", "quoted key", "version"]);
            assert!(matches!(&properties[2].2, Expr::Ident { name, .. } if name == "version"));
        }
        other => panic!("Expected LitObj, got {:?}", other),
    }
}

#[test]
fn test_function_expression() {
    match parse_expr("func (x) { return x; }") {
        Expr::Func { decl, .. } => {
            assert!(decl.name.is_none());
            assert_eq!(decl.params, vec!["x"]);
        }
        other => panic!("Expected Func expression, got {:?}", other),
    }
}

/* ===================== Errors ===================== */

#[test]
fn test_syntax_error_position() {
    let err = parse_program("var x = ;").unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    let span = err.span.expect("syntax errors carry a span");
    assert_eq!(span.line(), 1);
    assert!(span.column() > 1);
}

#[test]
fn test_lexical_error_reported_before_parsing() {
    let err = parse_program("var x = 1;\nvar y = @;").unwrap_err();
    assert_eq!(err.kind, ErrorKind::LexicalError);
    assert_eq!(err.span.map(|s| s.line()), Some(2));
}

#[test]
fn test_comments_and_optional_semicolons() {
    let source = r#"
// leading comment
var a = 1 /* inline */
var b = a
"#;
    let program = parse_program(source).expect("Should parse");
    assert_eq!(program.body.len(), 2);
}

#[test]
fn test_ast_serializes_with_tags() {
    let program = parse("break").expect("Should parse");
    let json = serde_json::to_value(&program).unwrap();
    assert_eq!(json["body"][0]["t"], "Break");
}
