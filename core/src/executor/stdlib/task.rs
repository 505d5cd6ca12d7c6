//! `task`: creating and combining tasks

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Args, Exports};
use crate::executor::types::{Span, Val};
use crate::executor::Interpreter;
use crate::errors::ScriptResult;
use crate::task::{TaskRef, TaskState};

/// Fulfill with every value once all tasks fulfill; reject with the first rejection
///
/// Non-task items are taken as already fulfilled values.
fn all(interp: &mut Interpreter, items: Vec<Val>, span: Span) -> ScriptResult<TaskRef> {
    let combined = TaskRef::pending();
    let values = Rc::new(RefCell::new(Vec::with_capacity(items.len())));
    let mut pending = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Val::Task(task) => {
                values.borrow_mut().push(Val::Nil);
                pending.push((index, task));
            }
            other => values.borrow_mut().push(other),
        }
    }

    let remaining = Rc::new(Cell::new(pending.len()));
    if pending.is_empty() {
        let collected = values.borrow().clone();
        combined.resolve(interp, Val::list(collected))?;
        return Ok(combined);
    }

    for (index, task) in pending {
        let on_fulfilled = {
            let (combined, values, remaining) =
                (combined.clone(), Rc::clone(&values), Rc::clone(&remaining));
            Val::native("task.all.fulfilled", move |interp, args, _| {
                values.borrow_mut()[index] = args.into_iter().next().unwrap_or_default();
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let collected = values.borrow().clone();
                    combined.resolve(interp, Val::list(collected))?;
                }
                Ok(Val::Nil)
            })
        };
        let on_rejected = {
            let combined = combined.clone();
            Val::native("task.all.rejected", move |interp, args, _| {
                combined.reject(interp, args.into_iter().next().unwrap_or_default())?;
                Ok(Val::Nil)
            })
        };
        task.then(interp, on_fulfilled, span)?;
        task.catch(interp, on_rejected, span)?;
        if combined.state() == TaskState::Rejected {
            break;
        }
    }
    Ok(combined)
}

pub fn exports() -> Exports {
    vec![
        (
            "create",
            Val::native("task.create", |interp, args, span| {
                let executor = Args::new("task.create", &args, span).callable(0)?;
                Ok(Val::Task(TaskRef::from_executor(interp, &executor, span)?))
            }),
        ),
        (
            "resolved",
            Val::native("task.resolved", |_, args, _| {
                Ok(Val::Task(TaskRef::fulfilled(
                    args.into_iter().next().unwrap_or_default(),
                )))
            }),
        ),
        (
            "rejected",
            Val::native("task.rejected", |_, args, _| {
                Ok(Val::Task(TaskRef::rejected(
                    args.into_iter().next().unwrap_or_default(),
                )))
            }),
        ),
        (
            "all",
            Val::native("task.all", |interp, args, span| {
                let items = Args::new("task.all", &args, span).list(0)?;
                Ok(Val::Task(all(interp, items, span)?))
            }),
        ),
        (
            "isTask",
            Val::native("task.isTask", |_, args, _| {
                Ok(Val::Bool(matches!(args.first(), Some(Val::Task(_)))))
            }),
        ),
    ]
}
