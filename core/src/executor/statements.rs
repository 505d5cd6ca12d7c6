//! Statement execution
//!
//! Each handler runs after its own frame has been popped. Handlers for
//! composite statements push frames and return immediately; the driver picks
//! the pushed frames up on the following steps.

use std::rc::Rc;

use super::types::{
    AssignOp, Closure, Expr, Frame, MemberAccess, Span, Stmt, StmtRef, Val,
};
use super::{EnvId, Interpreter};
use crate::errors::{ScriptError, ScriptResult};

/// Resolved last segment of an assignment path
enum Slot {
    Prop(String),
    Index(Val),
}

impl Interpreter {
    pub fn execute_statement(&mut self, env: EnvId, node: &StmtRef) -> ScriptResult<()> {
        match &**node {
            Stmt::Var { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval_expr(env, expr)?,
                    None => Val::Nil,
                };
                self.envs.declare(env, name.clone(), value);
            }

            Stmt::Assign {
                var,
                var_span,
                path,
                op,
                value,
                span,
            } => self.execute_assign(env, var, *var_span, path, *op, value, *span)?,

            Stmt::Func { decl, .. } => {
                let closure = Val::Func(Rc::new(Closure {
                    decl: Rc::clone(decl),
                    env,
                }));
                if let Some(name) = &decl.name {
                    self.envs.declare(env, name.clone(), closure);
                }
            }

            Stmt::Block { body, .. } => {
                let scope = self.envs.child(env);
                self.push_statements(scope, body);
            }

            Stmt::If {
                test,
                then_s,
                else_s,
                ..
            } => {
                let branch = if self.eval_expr(env, test)?.is_truthy() {
                    Some(then_s)
                } else {
                    else_s.as_ref()
                };
                if let Some(branch) = branch {
                    self.runtime
                        .stack
                        .add(Frame::statement(env, Rc::clone(branch)));
                }
            }

            Stmt::While { .. } => {
                self.runtime.enter_loop();
                self.runtime
                    .stack
                    .add(Frame::loop_frame(env, Rc::clone(node), None));
            }

            Stmt::ForIn { iterable, .. } => {
                let value = self.eval_expr(env, iterable)?;
                let items = iteration_items(&value, iterable.span())?;
                self.runtime.enter_loop();
                self.runtime
                    .stack
                    .add(Frame::loop_frame(env, Rc::clone(node), Some(Rc::new(items))));
            }

            Stmt::Return { value, span } => {
                let result = match value {
                    Some(expr) => self.eval_expr(env, expr)?,
                    None => Val::Nil,
                };
                self.runtime.unwind_return(*span)?;
                self.runtime.is_return = true;
                self.runtime.last_result = result;
            }

            Stmt::Break { span } => {
                self.runtime.is_break = true;
                self.runtime.unwind_break(*span)?;
            }

            Stmt::Continue { span } => {
                self.runtime.is_continue = true;
                self.runtime.unwind_continue(*span)?;
            }

            Stmt::Import {
                specifier,
                binding,
                span,
            } => self.import_module(env, specifier, binding, *span)?,

            Stmt::Expr { expr, .. } => {
                let value = self.eval_expr(env, expr)?;
                if self.runtime.function_depth() == 0 {
                    self.runtime.completion = value;
                }
            }
        }
        Ok(())
    }

    /* ===================== Assignment ===================== */

    #[allow(clippy::too_many_arguments)]
    fn execute_assign(
        &mut self,
        env: EnvId,
        var: &str,
        var_span: Span,
        path: &[MemberAccess],
        op: AssignOp,
        value: &Expr,
        span: Span,
    ) -> ScriptResult<()> {
        let Some((last, prefix)) = path.split_last() else {
            let rhs = self.eval_expr(env, value)?;
            let new_value = match op.binary() {
                Some(bop) => {
                    let current = self.envs.lookup(env, var, var_span)?;
                    self.binary_values(bop, current, rhs, span)?
                }
                None => rhs,
            };
            return self.envs.assign(env, var, new_value, var_span);
        };

        let mut target = self.envs.lookup(env, var, var_span)?;
        for segment in prefix {
            target = match segment {
                MemberAccess::Prop { property, span } => self.get_member(&target, property, *span)?,
                MemberAccess::Index { expr, span } => {
                    let index = self.eval_expr(env, expr)?;
                    self.get_index(&target, &index, *span)?
                }
            };
        }

        let (slot, slot_span) = match last {
            MemberAccess::Prop { property, span } => (Slot::Prop(property.clone()), *span),
            MemberAccess::Index { expr, span } => (Slot::Index(self.eval_expr(env, expr)?), *span),
        };
        let rhs = self.eval_expr(env, value)?;
        let new_value = match op.binary() {
            Some(bop) => {
                let current = match &slot {
                    Slot::Prop(property) => self.get_member(&target, property, slot_span)?,
                    Slot::Index(index) => self.get_index(&target, index, slot_span)?,
                };
                self.binary_values(bop, current, rhs, span)?
            }
            None => rhs,
        };
        store(&target, slot, new_value, slot_span)
    }
}

/// Write `value` into an object property or list element
fn store(target: &Val, slot: Slot, value: Val, span: Span) -> ScriptResult<()> {
    match (target, slot) {
        (Val::Obj(map), Slot::Prop(key)) => {
            map.borrow_mut().insert(key, value);
            Ok(())
        }
        (Val::Obj(map), Slot::Index(Val::Str(key))) => {
            map.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        (Val::List(items), Slot::Index(Val::Int(index))) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            match usize::try_from(index).ok().filter(|i| *i < len) {
                Some(i) => {
                    items[i] = value;
                    Ok(())
                }
                None => Err(ScriptError::type_error(
                    format!("list index {} out of range (length {})", index, len),
                    span,
                )),
            }
        }
        (target, Slot::Prop(key)) => Err(ScriptError::type_error(
            format!("cannot set property '{}' on {}", key, target.type_name()),
            span,
        )),
        (target, Slot::Index(index)) => Err(ScriptError::type_error(
            format!(
                "cannot assign {} index on {}",
                index.type_name(),
                target.type_name()
            ),
            span,
        )),
    }
}

/// Snapshot of the values a `for` loop walks over
fn iteration_items(value: &Val, span: Span) -> ScriptResult<Vec<Val>> {
    match value {
        Val::List(items) => Ok(items.borrow().clone()),
        Val::Obj(map) => Ok(map.borrow().keys().map(|k| Val::string(k.as_str())).collect()),
        Val::Str(s) => Ok(s.chars().map(|c| Val::string(c.to_string())).collect()),
        other => Err(ScriptError::type_error(
            format!("cannot iterate over {}", other.type_name()),
            span,
        )),
    }
}
