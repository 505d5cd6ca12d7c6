//! Rule: Control Flow Placement
//!
//! Reports an error for `return` outside any function body, and for `break`
//! or `continue` outside a loop of the same function.
//!
//! # Examples
//!
//! ```tempo
//! // Error: the loop belongs to the caller, not to `f`
//! while (true) {
//!     func f() { break; }
//! }
//! ```
//!
//! ```tempo
//! // OK
//! func f(items) {
//!     for (var x in items) { if (x) { break; } }
//!     return 1;
//! }
//! ```

use crate::executor::types::{Expr, FuncDecl, Program, Stmt, StmtRef};

use super::super::{nested_functions, ValidationError, ValidationRule};

/// Rule that checks where return/break/continue appear.
pub struct ControlFlowPlacementRule;

impl ValidationRule for ControlFlowPlacementRule {
    fn id(&self) -> &'static str {
        "control-flow-placement"
    }

    fn description(&self) -> &'static str {
        "return must be inside a function; break and continue inside a loop of the same function"
    }

    fn validate(&self, program: &Program, _source: &str) -> Vec<ValidationError> {
        let mut checker = Checker {
            errors: Vec::new(),
            rule_id: self.id(),
        };
        checker.check_stmts(&program.body, Context::default());
        checker.errors
    }
}

/// Where the statement being checked sits
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_function: bool,
    in_loop: bool,
}

struct Checker {
    errors: Vec<ValidationError>,
    rule_id: &'static str,
}

impl Checker {
    fn check_stmts(&mut self, stmts: &[StmtRef], ctx: Context) {
        for stmt in stmts {
            self.check_stmt(stmt, ctx);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, ctx: Context) {
        match stmt {
            Stmt::Return { value, span } => {
                if !ctx.in_function {
                    self.errors.push(ValidationError::error(
                        *span,
                        "return outside function body",
                        self.rule_id,
                    ));
                }
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }

            Stmt::Break { span } | Stmt::Continue { span } if !ctx.in_loop => {
                let keyword = if matches!(stmt, Stmt::Break { .. }) {
                    "break"
                } else {
                    "continue"
                };
                self.errors.push(ValidationError::error(
                    *span,
                    format!("{} outside loop body", keyword),
                    self.rule_id,
                ));
            }

            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Import { .. } => {}

            Stmt::Func { decl, .. } => self.check_function(decl),

            Stmt::Block { body, .. } => self.check_stmts(body, ctx),

            Stmt::If {
                test,
                then_s,
                else_s,
                ..
            } => {
                self.check_expr(test);
                self.check_stmt(then_s, ctx);
                if let Some(else_s) = else_s {
                    self.check_stmt(else_s, ctx);
                }
            }

            Stmt::While { test, body, .. } => {
                self.check_expr(test);
                self.check_stmt(body, Context { in_loop: true, ..ctx });
            }

            Stmt::ForIn { iterable, body, .. } => {
                self.check_expr(iterable);
                self.check_stmt(body, Context { in_loop: true, ..ctx });
            }

            Stmt::Var { init, .. } => {
                if let Some(init) = init {
                    self.check_expr(init);
                }
            }

            Stmt::Assign { value, .. } => self.check_expr(value),

            Stmt::Expr { expr, .. } => self.check_expr(expr),
        }
    }

    /// Function bodies start a fresh context: loops outside do not count
    fn check_function(&mut self, decl: &FuncDecl) {
        self.check_stmts(
            &decl.body,
            Context {
                in_function: true,
                in_loop: false,
            },
        );
    }

    fn check_expr(&mut self, expr: &Expr) {
        let mut functions = Vec::new();
        nested_functions(expr, &mut functions);
        for decl in functions {
            self.check_function(decl);
        }
    }
}
