//! Expression evaluation
//!
//! Expressions are evaluated recursively; the recursion is bounded by the
//! nesting of the source text, and [`ensure_sufficient_stack`] guards it.
//! Calls to user functions start a nested driver on the shared call stack.

use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::stack::ensure_sufficient_stack;
use super::types::{BinaryOp, Closure, Expr, Span, UnaryOp, Val};
use super::{EnvId, Interpreter};
use crate::errors::{ErrorKind, ScriptError, ScriptResult};

impl Interpreter {
    pub fn eval_expr(&mut self, env: EnvId, expr: &Expr) -> ScriptResult<Val> {
        ensure_sufficient_stack(|| self.eval_inner(env, expr))
    }

    fn eval_inner(&mut self, env: EnvId, expr: &Expr) -> ScriptResult<Val> {
        match expr {
            Expr::LitBool { v, .. } => Ok(Val::Bool(*v)),
            Expr::LitInt { v, .. } => Ok(Val::Int(*v)),
            Expr::LitFloat { v, .. } => Ok(Val::Float(*v)),
            Expr::LitStr { v, .. } => Ok(Val::string(v.as_str())),
            Expr::LitNil { .. } => Ok(Val::Nil),

            Expr::LitList { elements, .. } => {
                let items = elements
                    .iter()
                    .map(|e| self.eval_expr(env, e))
                    .collect::<ScriptResult<Vec<_>>>()?;
                Ok(Val::list(items))
            }

            Expr::LitObj { properties, .. } => {
                let mut map = IndexMap::with_capacity(properties.len());
                for (key, _, value) in properties {
                    let value = self.eval_expr(env, value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Val::object(map))
            }

            Expr::Ident { name, span } => self.envs.lookup(env, name, *span),

            Expr::Member {
                object,
                property,
                property_span,
                ..
            } => {
                let target = self.eval_expr(env, object)?;
                self.get_member(&target, property, *property_span)
            }

            Expr::Index {
                object,
                index,
                span,
            } => {
                let target = self.eval_expr(env, object)?;
                let index = self.eval_expr(env, index)?;
                self.get_index(&target, &index, *span)
            }

            Expr::Call { callee, args, span } => {
                let function = self.eval_expr(env, callee)?;
                let args = args
                    .iter()
                    .map(|a| self.eval_expr(env, a))
                    .collect::<ScriptResult<Vec<_>>>()?;
                if !function.is_callable() {
                    let message = match &**callee {
                        Expr::Ident { name, .. } => format!("'{}' is not a function", name),
                        _ => format!("{} value is not callable", function.type_name()),
                    };
                    return Err(ScriptError::at(ErrorKind::FunctionCallError, message, *span));
                }
                self.call_value(&function, args, *span)
            }

            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
                ..
            } => {
                let left = self.eval_expr(env, left)?;
                if left.is_truthy() {
                    self.eval_expr(env, right)
                } else {
                    Ok(left)
                }
            }

            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
                ..
            } => {
                let left = self.eval_expr(env, left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval_expr(env, right)
                }
            }

            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left = self.eval_expr(env, left)?;
                let right = self.eval_expr(env, right)?;
                self.binary_values(*op, left, right, *span)
            }

            Expr::Unary { op, operand, span } => {
                let value = self.eval_expr(env, operand)?;
                match op {
                    UnaryOp::Not => Ok(Val::Bool(!value.is_truthy())),
                    UnaryOp::Neg => self.negate(value, *span),
                }
            }

            Expr::Func { decl, .. } => Ok(Val::Func(Rc::new(Closure {
                decl: Rc::clone(decl),
                env,
            }))),
        }
    }

    /* ===================== Calls ===================== */

    /// Call any callable value
    pub fn call_value(&mut self, function: &Val, args: Vec<Val>, span: Span) -> ScriptResult<Val> {
        match function {
            Val::Func(closure) => self.call_function(closure, args, span),
            Val::Native(native) => native.call(self, args, span),
            other => Err(ScriptError::at(
                ErrorKind::FunctionCallError,
                format!("{} value is not callable", other.type_name()),
                span,
            )),
        }
    }

    /// Run a user function to completion on a nested driver
    ///
    /// Missing arguments bind `nil`; extra arguments are ignored.
    pub fn call_function(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Val>,
        span: Span,
    ) -> ScriptResult<Val> {
        let limit = self.config().interpreter.max_call_depth;
        if self.runtime.function_depth() >= limit {
            return Err(ScriptError::at(
                ErrorKind::CallDepthError,
                format!("maximum call depth of {} exceeded", limit),
                span,
            ));
        }

        let decl = &closure.decl;
        let scope = self.envs.child(closure.env);
        let mut args = args.into_iter();
        for param in &decl.params {
            self.envs
                .declare(scope, param.clone(), args.next().unwrap_or_default());
        }
        trace!(
            function = decl.display_name(),
            depth = self.runtime.function_depth() + 1,
            "calling function"
        );

        let base = self.runtime.stack.cursor();
        let marker = self.runtime.enter_function();
        self.push_statements(scope, &decl.body);
        self.run_until(base)?;

        if self.runtime.is_return {
            self.runtime.is_return = false;
            Ok(mem::take(&mut self.runtime.last_result))
        } else {
            self.runtime.leave_function(marker);
            Ok(Val::Nil)
        }
    }

    /* ===================== Member Access ===================== */

    pub fn get_member(&mut self, target: &Val, property: &str, span: Span) -> ScriptResult<Val> {
        match target {
            Val::Obj(map) => map.borrow().get(property).cloned().ok_or_else(|| {
                ScriptError::type_error(format!("object has no property '{}'", property), span)
            }),

            Val::Str(s) if property == "length" => Ok(Val::Int(s.chars().count() as i64)),

            Val::List(items) => match property {
                "length" => Ok(Val::Int(items.borrow().len() as i64)),
                "push" => {
                    let items = Rc::clone(items);
                    Ok(Val::native("push", move |_, args, _| {
                        let mut items = items.borrow_mut();
                        items.extend(args);
                        Ok(Val::Int(items.len() as i64))
                    }))
                }
                _ => Err(no_property(target, property, span)),
            },

            Val::Task(task) => match property {
                "state" => Ok(Val::string(task.state().as_str())),
                "value" => Ok(task.value()),
                "id" => Ok(Val::string(task.id().to_string())),
                "then" | "catch" | "finally" => {
                    let task = task.clone();
                    let method = property.to_string();
                    Ok(Val::native(property, move |interp, args, span| {
                        let callback = args.into_iter().next().unwrap_or_default();
                        if !callback.is_callable() {
                            return Err(ScriptError::argument(
                                &format!("task.{}", method),
                                format!("expected a function, got {}", callback.type_name()),
                                span,
                            ));
                        }
                        let derived = match method.as_str() {
                            "then" => task.then(interp, callback, span)?,
                            "catch" => task.catch(interp, callback, span)?,
                            _ => task.finally(interp, callback, span)?,
                        };
                        Ok(Val::Task(derived))
                    }))
                }
                _ => Err(no_property(target, property, span)),
            },

            _ => Err(no_property(target, property, span)),
        }
    }

    pub fn get_index(&mut self, target: &Val, index: &Val, span: Span) -> ScriptResult<Val> {
        match (target, index) {
            (Val::List(items), Val::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.borrow().get(i).cloned())
                .unwrap_or_default()),
            (Val::Str(s), Val::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Val::string(c.to_string()))
                .unwrap_or_default()),
            (Val::Obj(_), Val::Str(key)) => self.get_member(target, key, span),
            _ => Err(ScriptError::type_error(
                format!(
                    "cannot index {} with {}",
                    target.type_name(),
                    index.type_name()
                ),
                span,
            )),
        }
    }
}

fn no_property(target: &Val, property: &str, span: Span) -> ScriptError {
    ScriptError::type_error(
        format!("cannot read property '{}' of {}", property, target.type_name()),
        span,
    )
}
