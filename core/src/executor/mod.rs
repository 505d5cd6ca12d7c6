//! # Executor - Stack-Driven Interpreter
//!
//! Statements never recurse natively. Composite statements (blocks, function
//! bodies, loop bodies, branches, module bodies) push their children onto the
//! [`CallStack`](call_stack::CallStack) and a driver steps the top frame with
//! [`Interpreter::resume`] until the stack drains back to a recorded base.
//!
//! ## Core Principles
//!
//! 1. **Per-instance state**: the runtime, the environment arena and the module
//!    caches all belong to one [`Interpreter`]; nothing is global
//! 2. **Explicit unwinding**: `return`, `break` and `continue` move the stack
//!    cursor back to a recorded marker instead of propagating up native frames
//! 3. **Nested drivers**: a call from inside an expression runs its own driver
//!    until the stack is back at the call site
//! 4. **Fatal errors**: every [`ScriptError`] aborts the current run

pub mod call_stack;
pub mod environment;
pub mod exec_loop;
pub mod expressions;
pub mod imports;
pub mod operators;
pub mod runtime;
mod stack;
pub mod statements;
pub mod stdlib;
pub mod types;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::mem;
use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use crate::config::Config;
use crate::errors::{ErrorKind, ScriptError, ScriptResult};
use crate::modules::{Fetcher, Location, ModuleOrigin, ModuleResolver};
use crate::parser;

pub use environment::{EnvId, Environments};
pub use runtime::{Runtime, Step};
pub use types::{Program, Span, Stmt, Val};

/// Where `print` writes
#[derive(Debug)]
enum Output {
    Stdout,
    Captured(Rc<RefCell<String>>),
}

/// A Tempo interpreter instance
pub struct Interpreter {
    pub runtime: Runtime,
    pub envs: Environments,
    pub modules: ModuleResolver,
    config: Config,
    /// Environment holding the prelude globals
    prelude: EnvId,
    /// Top-level scope of entry programs, shared by every run
    globals: EnvId,
    output: Output,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        let mut envs = Environments::new();
        let prelude = envs.root();
        stdlib::install_prelude(&mut envs, prelude);
        let globals = envs.child(prelude);
        Self {
            runtime: Runtime::new(),
            envs,
            modules: ModuleResolver::new(config.modules.clone()),
            config,
            prelude,
            globals,
            output: Output::Stdout,
        }
    }

    /// Collect `print` output in memory instead of writing to stdout
    pub fn with_captured_output(mut self) -> Self {
        self.output = Output::Captured(Rc::new(RefCell::new(String::new())));
        self
    }

    /// Drain captured output (empty when writing to stdout)
    pub fn take_output(&mut self) -> String {
        match &self.output {
            Output::Captured(buffer) => mem::take(&mut *buffer.borrow_mut()),
            Output::Stdout => String::new(),
        }
    }

    pub fn set_fetcher(&mut self, fetcher: Box<dyn Fetcher>) {
        self.modules.set_fetcher(fetcher);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn globals(&self) -> EnvId {
        self.globals
    }

    pub(crate) fn prelude(&self) -> EnvId {
        self.prelude
    }

    /// Value bound to `name` in the top-level scope (or the prelude)
    pub fn lookup_global(&self, name: &str) -> Option<Val> {
        self.envs.get(self.globals, name).cloned()
    }

    /// Forget every binding, loaded module and pending frame
    pub fn reset(&mut self) {
        let mut envs = Environments::new();
        let prelude = envs.root();
        stdlib::install_prelude(&mut envs, prelude);
        self.globals = envs.child(prelude);
        self.prelude = prelude;
        self.envs = envs;
        self.runtime.reset();
        self.modules.clear();
    }

    /* ===================== Entry Points ===================== */

    /// Parse and run `source`; `path` names the file it came from, if any
    ///
    /// Returns the value of the last top-level expression statement.
    pub fn run_source(&mut self, source: &str, path: Option<&Path>) -> ScriptResult<Val> {
        let origin = ModuleOrigin::entry(path);
        let program = parser::parse_program(source).map_err(|err| err.traced(&origin.name))?;
        self.run_program(&program, path)
    }

    pub fn run_file(&mut self, path: &Path) -> ScriptResult<Val> {
        let source = fs::read_to_string(path).map_err(|err| {
            ScriptError::new(
                ErrorKind::ImportError,
                format!("Failed to read '{}': {}", path.display(), err),
            )
        })?;
        self.run_source(&source, Some(path))
    }

    pub fn run_program(&mut self, program: &Program, path: Option<&Path>) -> ScriptResult<Val> {
        let origin = ModuleOrigin::entry(path);
        let name = origin.name.clone();
        debug!(origin = %name, statements = program.body.len(), "running program");

        // The entry file counts as loading, so importing it back is a cycle
        let entry_key = path.map(|path| {
            let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            Location::Path(resolved).key()
        });
        if let Some(key) = &entry_key {
            self.modules
                .begin_loading(key)
                .map_err(|err| ScriptError::from(err).traced(&name))?;
        }

        self.runtime.reset();
        self.runtime.push_origin(origin);
        self.push_statements(self.globals, &program.body);

        let result = self.run_until_done();
        let completion = mem::take(&mut self.runtime.completion);
        self.runtime.reset();
        if let Some(key) = &entry_key {
            self.modules.finish_loading(key);
        }

        match result {
            Ok(()) => Ok(completion),
            Err(err) => Err(err.traced(&name)),
        }
    }

    /* ===================== Output ===================== */

    pub fn write_output(&mut self, text: &str) {
        match &self.output {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                // A closed stdout is not a script error
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            Output::Captured(buffer) => buffer.borrow_mut().push_str(text),
        }
    }
}
