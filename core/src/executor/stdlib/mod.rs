//! Standard library
//!
//! Prelude globals live in the root environment of every interpreter.
//! Built-in modules are objects of native functions, created on first import
//! and cached by the module resolver for the lifetime of the interpreter.

pub mod fs;
pub mod hash;
pub mod json;
pub mod math;
pub mod module;
pub mod os;
pub mod path;
pub mod prelude;
pub mod task;
pub mod time;

use std::rc::Rc;

use indexmap::IndexMap;

use super::environment::{EnvId, Environments};
use super::types::{Span, Val};
use crate::errors::{ScriptError, ScriptResult};
use crate::task::TaskRef;

/// Names accepted by `import "<name>";`
pub const BUILTIN_MODULES: &[&str] = &[
    "fs", "hash", "json", "math", "module", "os", "path", "task", "time",
];

pub fn is_builtin_module(name: &str) -> bool {
    BUILTIN_MODULES.contains(&name)
}

/// Create a fresh built-in module object
pub fn builtin_module(name: &str) -> Option<Val> {
    let entries = match name {
        "fs" => fs::exports(),
        "hash" => hash::exports(),
        "json" => json::exports(),
        "math" => math::exports(),
        "module" => module::exports(),
        "os" => os::exports(),
        "path" => path::exports(),
        "task" => task::exports(),
        "time" => time::exports(),
        _ => return None,
    };
    let map: IndexMap<String, Val> = entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    Some(Val::object(map))
}

/// Bind the prelude globals into `env`
pub fn install_prelude(envs: &mut Environments, env: EnvId) {
    for (name, value) in prelude::exports() {
        envs.declare(env, name, value);
    }
}

pub(crate) type Exports = Vec<(&'static str, Val)>;

/* ===================== Argument Helpers ===================== */

/// Positional arguments of a native call, tagged with the function name for errors
pub(crate) struct Args<'a> {
    function: &'a str,
    values: &'a [Val],
    span: Span,
}

impl<'a> Args<'a> {
    pub fn new(function: &'a str, values: &'a [Val], span: Span) -> Self {
        Self {
            function,
            values,
            span,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn error(&self, message: impl std::fmt::Display) -> ScriptError {
        ScriptError::argument(self.function, message, self.span)
    }

    /// Argument `index`, or `nil` when it was not passed
    pub fn optional(&self, index: usize) -> Val {
        self.values.get(index).cloned().unwrap_or_default()
    }

    pub fn required(&self, index: usize) -> ScriptResult<&'a Val> {
        self.values.get(index).ok_or_else(|| {
            self.error(format!(
                "expected at least {} argument{}, got {}",
                index + 1,
                if index == 0 { "" } else { "s" },
                self.values.len()
            ))
        })
    }

    pub fn string(&self, index: usize) -> ScriptResult<Rc<str>> {
        match self.required(index)? {
            Val::Str(s) => Ok(Rc::clone(s)),
            other => Err(self.mismatch(index, "a string", other)),
        }
    }

    pub fn number(&self, index: usize) -> ScriptResult<f64> {
        let value = self.required(index)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(index, "a number", value))
    }

    pub fn callable(&self, index: usize) -> ScriptResult<Val> {
        let value = self.required(index)?;
        if value.is_callable() {
            Ok(value.clone())
        } else {
            Err(self.mismatch(index, "a function", value))
        }
    }

    pub fn list(&self, index: usize) -> ScriptResult<Vec<Val>> {
        match self.required(index)? {
            Val::List(items) => Ok(items.borrow().clone()),
            other => Err(self.mismatch(index, "a list", other)),
        }
    }

    fn mismatch(&self, index: usize, expected: &str, got: &Val) -> ScriptError {
        self.error(format!(
            "argument {} must be {}, got {}",
            index + 1,
            expected,
            got.type_name()
        ))
    }
}

/// Settle a task from a host result: `Ok` fulfills, `Err` rejects with the message
pub(crate) fn settled_task<E: std::fmt::Display>(result: Result<Val, E>) -> Val {
    match result {
        Ok(value) => Val::Task(TaskRef::fulfilled(value)),
        Err(err) => Val::Task(TaskRef::rejected(Val::string(err.to_string()))),
    }
}

