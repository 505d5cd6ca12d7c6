//! Task runtime
//!
//! A task is a synchronous deferred value. It starts pending and settles at
//! most once, to fulfilled or rejected. Subscribers attached with `then`,
//! `catch` and `finally` fire synchronously at settlement (or immediately
//! when attached to an already settled task), and each attachment returns a
//! derived task carrying the subscriber's outcome.
//!
//! There is no scheduler: everything happens inside the call that settles
//! the task.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use serde::Serialize;
use tracing::trace;
use uuid::Uuid;

use crate::errors::ScriptResult;
use crate::executor::types::{Span, Val};
use crate::executor::Interpreter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Pending,
    Fulfilled,
    Rejected,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Fulfilled => "fulfilled",
            TaskState::Rejected => "rejected",
        }
    }
}

/// Subscriber registered on a task
enum Reaction {
    /// Call `callback` with the settled value and resolve `derived` with its result
    Invoke {
        callback: Val,
        derived: TaskRef,
        span: Span,
        /// Re-attach to the inner task when the value is itself a task
        unwrap: bool,
    },
    /// Settle `derived` the same way as the source task
    Forward { derived: TaskRef },
    /// Call `callback` without arguments, then mirror the source outcome
    Finally {
        callback: Val,
        derived: TaskRef,
        span: Span,
    },
}

struct TaskCell {
    id: Uuid,
    state: TaskState,
    value: Val,
    on_fulfilled: Vec<Reaction>,
    on_rejected: Vec<Reaction>,
    on_finally: Vec<Reaction>,
}

/// Shared handle to a task
#[derive(Clone)]
pub struct TaskRef(Rc<RefCell<TaskCell>>);

impl fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.0.borrow();
        write!(f, "Task({}, {})", cell.id, cell.state.as_str())
    }
}

impl TaskRef {
    fn with_state(state: TaskState, value: Val) -> Self {
        TaskRef(Rc::new(RefCell::new(TaskCell {
            id: Uuid::new_v4(),
            state,
            value,
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
            on_finally: Vec::new(),
        })))
    }

    pub fn pending() -> Self {
        Self::with_state(TaskState::Pending, Val::Nil)
    }

    pub fn fulfilled(value: Val) -> Self {
        Self::with_state(TaskState::Fulfilled, value)
    }

    pub fn rejected(reason: Val) -> Self {
        Self::with_state(TaskState::Rejected, reason)
    }

    /// Create a pending task and run `executor(resolve, reject)` on it
    pub fn from_executor(interp: &mut Interpreter, executor: &Val, span: Span) -> ScriptResult<Self> {
        let task = Self::pending();
        let resolve = {
            let task = task.clone();
            Val::native("resolve", move |interp, args, _span| {
                let value = args.into_iter().next().unwrap_or(Val::Nil);
                task.resolve(interp, value)?;
                Ok(Val::Nil)
            })
        };
        let reject = {
            let task = task.clone();
            Val::native("reject", move |interp, args, _span| {
                let reason = args.into_iter().next().unwrap_or(Val::Nil);
                task.reject(interp, reason)?;
                Ok(Val::Nil)
            })
        };
        interp.call_value(executor, vec![resolve, reject], span)?;
        Ok(task)
    }

    pub fn id(&self) -> Uuid {
        self.0.borrow().id
    }

    pub fn state(&self) -> TaskState {
        self.0.borrow().state
    }

    /// Settled value or rejection reason (`nil` while pending)
    pub fn value(&self) -> Val {
        self.0.borrow().value.clone()
    }

    pub fn ptr_eq(&self, other: &TaskRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /* ===================== Settlement ===================== */

    pub fn resolve(&self, interp: &mut Interpreter, value: Val) -> ScriptResult<()> {
        self.settle(interp, TaskState::Fulfilled, value)
    }

    pub fn reject(&self, interp: &mut Interpreter, reason: Val) -> ScriptResult<()> {
        self.settle(interp, TaskState::Rejected, reason)
    }

    /// Move out of pending and fire subscribers; a no-op once settled
    fn settle(&self, interp: &mut Interpreter, state: TaskState, value: Val) -> ScriptResult<()> {
        let (fired, finals) = {
            let mut cell = self.0.borrow_mut();
            if cell.state != TaskState::Pending {
                return Ok(());
            }
            cell.state = state;
            cell.value = value.clone();
            let fulfilled = mem::take(&mut cell.on_fulfilled);
            let rejected = mem::take(&mut cell.on_rejected);
            let fired = match state {
                TaskState::Rejected => rejected,
                _ => fulfilled,
            };
            (fired, mem::take(&mut cell.on_finally))
        };
        trace!(task = %self.id(), state = state.as_str(), subscribers = fired.len() + finals.len(), "task settled");

        for reaction in fired.into_iter().chain(finals) {
            run_reaction(interp, reaction, state, &value)?;
        }
        Ok(())
    }

    /* ===================== Subscription ===================== */

    /// Register reactions for each outcome, or run the matching one now
    fn subscribe(
        &self,
        interp: &mut Interpreter,
        on_fulfilled: Reaction,
        on_rejected: Reaction,
    ) -> ScriptResult<()> {
        let settled = {
            let mut cell = self.0.borrow_mut();
            match cell.state {
                TaskState::Pending => {
                    cell.on_fulfilled.push(on_fulfilled);
                    cell.on_rejected.push(on_rejected);
                    None
                }
                TaskState::Fulfilled => Some((on_fulfilled, TaskState::Fulfilled, cell.value.clone())),
                TaskState::Rejected => Some((on_rejected, TaskState::Rejected, cell.value.clone())),
            }
        };
        match settled {
            Some((reaction, state, value)) => run_reaction(interp, reaction, state, &value),
            None => Ok(()),
        }
    }

    pub fn then(&self, interp: &mut Interpreter, callback: Val, span: Span) -> ScriptResult<TaskRef> {
        let derived = TaskRef::pending();
        self.subscribe(
            interp,
            Reaction::Invoke {
                callback,
                derived: derived.clone(),
                span,
                unwrap: true,
            },
            Reaction::Forward {
                derived: derived.clone(),
            },
        )?;
        Ok(derived)
    }

    pub fn catch(&self, interp: &mut Interpreter, callback: Val, span: Span) -> ScriptResult<TaskRef> {
        let derived = TaskRef::pending();
        self.subscribe(
            interp,
            Reaction::Forward {
                derived: derived.clone(),
            },
            Reaction::Invoke {
                callback,
                derived: derived.clone(),
                span,
                unwrap: true,
            },
        )?;
        Ok(derived)
    }

    pub fn finally(&self, interp: &mut Interpreter, callback: Val, span: Span) -> ScriptResult<TaskRef> {
        let derived = TaskRef::pending();
        let state = self.state();
        if state == TaskState::Pending {
            self.0.borrow_mut().on_finally.push(Reaction::Finally {
                callback,
                derived: derived.clone(),
                span,
            });
        } else {
            let value = self.value();
            run_reaction(
                interp,
                Reaction::Finally {
                    callback,
                    derived: derived.clone(),
                    span,
                },
                state,
                &value,
            )?;
        }
        Ok(derived)
    }
}

fn run_reaction(
    interp: &mut Interpreter,
    reaction: Reaction,
    state: TaskState,
    value: &Val,
) -> ScriptResult<()> {
    match reaction {
        Reaction::Invoke {
            callback,
            derived,
            span,
            unwrap,
        } => {
            if let (true, Val::Task(inner)) = (unwrap, value) {
                // One level of unwrapping: wait for the inner task's matching event
                let invoke = Reaction::Invoke {
                    callback,
                    derived: derived.clone(),
                    span,
                    unwrap: false,
                };
                let forward = Reaction::Forward { derived };
                return match state {
                    TaskState::Rejected => inner.subscribe(interp, forward, invoke),
                    _ => inner.subscribe(interp, invoke, forward),
                };
            }
            let result = interp.call_value(&callback, vec![value.clone()], span)?;
            derived.resolve(interp, result)
        }
        Reaction::Forward { derived } => derived.settle(interp, state, value.clone()),
        Reaction::Finally {
            callback,
            derived,
            span,
        } => {
            interp.call_value(&callback, vec![], span)?;
            derived.settle(interp, state, value.clone())
        }
    }
}
