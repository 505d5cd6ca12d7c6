//! Rule: Unreachable Code
//!
//! Reports a warning when code appears after a statement that always exits
//! (return, break, continue).
//!
//! # Examples
//!
//! ```tempo
//! // Warning: code after return is unreachable
//! return 5;
//! var x = 10;  // <-- unreachable
//! ```
//!
//! ```tempo
//! // OK: return is in a branch, so code after is reachable
//! if (condition) {
//!     return 5;
//! }
//! var x = 10;
//! ```

use crate::executor::types::{Expr, Program, Stmt, StmtRef};

use super::super::{nested_functions, ValidationError, ValidationRule};

/// Rule that checks for unreachable code.
pub struct UnreachableCodeRule;

impl ValidationRule for UnreachableCodeRule {
    fn id(&self) -> &'static str {
        "unreachable-code"
    }

    fn description(&self) -> &'static str {
        "Code after return/break/continue is unreachable"
    }

    fn validate(&self, program: &Program, _source: &str) -> Vec<ValidationError> {
        let mut diagnostics = Vec::new();
        check_stmts(&program.body, &mut diagnostics, self.id());
        diagnostics
    }
}

/// Check a list of statements for unreachable code
fn check_stmts(stmts: &[StmtRef], diagnostics: &mut Vec<ValidationError>, rule_id: &'static str) {
    let mut terminator: Option<&'static str> = None;

    for stmt in stmts {
        if let Some(keyword) = terminator {
            diagnostics.push(ValidationError::warning(
                stmt.span(),
                format!("Unreachable code after {}", keyword),
                rule_id,
            ));
            // Only the first unreachable statement is reported
            break;
        }

        terminator = terminator_keyword(stmt);
        check_stmt_children(stmt, diagnostics, rule_id);
    }
}

/// Keyword of the exit a statement always takes, if it never falls through
fn terminator_keyword(stmt: &Stmt) -> Option<&'static str> {
    match stmt {
        Stmt::Return { .. } => Some("return"),
        Stmt::Break { .. } => Some("break"),
        Stmt::Continue { .. } => Some("continue"),

        // A block terminates if its last statement terminates
        Stmt::Block { body, .. } => body.last().and_then(|s| terminator_keyword(s)),

        // If/else terminates only if BOTH branches terminate
        Stmt::If { then_s, else_s, .. } => {
            let then_exit = terminator_keyword(then_s)?;
            let else_exit = terminator_keyword(else_s.as_ref()?)?;
            Some(if then_exit == else_exit {
                then_exit
            } else {
                "if/else"
            })
        }

        Stmt::Var { .. }
        | Stmt::Assign { .. }
        | Stmt::Func { .. }
        | Stmt::While { .. }
        | Stmt::ForIn { .. }
        | Stmt::Import { .. }
        | Stmt::Expr { .. } => None,
    }
}

/// Recursively check children of a statement
fn check_stmt_children(stmt: &Stmt, diagnostics: &mut Vec<ValidationError>, rule_id: &'static str) {
    match stmt {
        Stmt::Block { body, .. } => check_stmts(body, diagnostics, rule_id),

        Stmt::If { then_s, else_s, .. } => {
            check_stmt_children(then_s, diagnostics, rule_id);
            if let Some(else_stmt) = else_s {
                check_stmt_children(else_stmt, diagnostics, rule_id);
            }
        }

        Stmt::While { body, .. } | Stmt::ForIn { body, .. } => {
            check_stmt_children(body, diagnostics, rule_id);
        }

        Stmt::Func { decl, .. } => check_stmts(&decl.body, diagnostics, rule_id),

        Stmt::Var { init: Some(expr), .. }
        | Stmt::Assign { value: expr, .. }
        | Stmt::Return {
            value: Some(expr), ..
        }
        | Stmt::Expr { expr, .. } => check_expr(expr, diagnostics, rule_id),

        Stmt::Var { .. }
        | Stmt::Return { .. }
        | Stmt::Break { .. }
        | Stmt::Continue { .. }
        | Stmt::Import { .. } => {}
    }
}

fn check_expr(expr: &Expr, diagnostics: &mut Vec<ValidationError>, rule_id: &'static str) {
    let mut functions = Vec::new();
    nested_functions(expr, &mut functions);
    for decl in functions {
        check_stmts(&decl.body, diagnostics, rule_id);
    }
}
