//! Core execution loop
//!
//! [`Interpreter::resume`] executes exactly one frame: the statement on top
//! of the stack, or one iteration step of the loop on top of the stack.
//! Drivers call it repeatedly until the cursor is back at their base.

use std::rc::Rc;

use super::stack::ensure_sufficient_stack;
use super::types::{Frame, FrameKind, Stmt, StmtRef, Val};
use super::{EnvId, Interpreter, Step};
use crate::errors::{ScriptError, ScriptResult};

impl Interpreter {
    /* ===================== Drivers ===================== */

    /// Run until the stack is empty
    pub fn run_until_done(&mut self) -> ScriptResult<()> {
        self.run_until(-1)
    }

    /// Run until the cursor drops to `base`
    ///
    /// Nested drivers (function calls, module bodies) record the cursor before
    /// pushing their frames and pass it here.
    pub fn run_until(&mut self, base: isize) -> ScriptResult<()> {
        ensure_sufficient_stack(|| {
            while self.runtime.stack.cursor() > base {
                if self.resume()? == Step::Done {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Execute the top frame
    pub fn resume(&mut self) -> ScriptResult<Step> {
        self.runtime.is_break = false;

        let Some(frame) = self.runtime.stack.peek().cloned() else {
            return Ok(Step::Done);
        };

        match frame.kind {
            FrameKind::Loop { iteration, items } => {
                self.step_loop(frame.env, &frame.node, iteration, items)?;
            }
            FrameKind::Statement => {
                if frame.is_continue() {
                    self.runtime.is_continue = true;
                }
                // Remove the frame first so anything it pushes lands above the cursor
                self.runtime.stack.pop();
                self.execute_statement(frame.env, &frame.node)?;
            }
        }
        Ok(Step::Continue)
    }

    /// Push `body` so its first statement ends up on top
    pub fn push_statements(&mut self, env: EnvId, body: &[StmtRef]) {
        for stmt in body.iter().rev() {
            self.runtime.stack.add(Frame::statement(env, Rc::clone(stmt)));
        }
    }

    /* ===================== Loops ===================== */

    /// Start the next iteration of the loop on top of the stack, or retire it
    fn step_loop(
        &mut self,
        env: EnvId,
        node: &StmtRef,
        iteration: usize,
        items: Option<Rc<Vec<Val>>>,
    ) -> ScriptResult<()> {
        self.runtime.is_continue = false;

        let next = match &**node {
            Stmt::While { test, body, .. } => {
                if self.eval_expr(env, test)?.is_truthy() {
                    Some(Frame::statement(env, Rc::clone(body)))
                } else {
                    None
                }
            }
            Stmt::ForIn { binding, body, .. } => {
                let item = items.as_ref().and_then(|items| items.get(iteration).cloned());
                item.map(|item| {
                    let scope = self.envs.child(env);
                    self.envs.declare(scope, binding.clone(), item);
                    Frame::statement(scope, Rc::clone(body))
                })
            }
            other => {
                return Err(ScriptError::control_flow(
                    "loop frame holds a non-loop statement",
                    other.span(),
                ))
            }
        };

        match next {
            Some(body) => {
                if let Some(Frame {
                    kind: FrameKind::Loop { iteration, .. },
                    ..
                }) = self.runtime.stack.peek_mut()
                {
                    *iteration += 1;
                }
                self.runtime.stack.add(body);
            }
            None => {
                self.runtime.stack.pop();
                self.runtime.leave_loop();
            }
        }
        Ok(())
    }
}
