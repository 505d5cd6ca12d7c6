//! Test helpers for executor tests
//!
//! Common utilities for running scripts and laying out module trees

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ScriptError;
use crate::executor::{Interpreter, Program, Val};
use crate::modules::{Fetcher, ModuleError};
use crate::parser::{self, semantic_validator};

/// Parse source, validate, and round-trip the AST through JSON
///
/// Panics if the program has validation errors, so scripts handed to this
/// helper are known to be well formed before they run.
pub fn parse_validated(source: &str) -> Program {
    let program = parser::parse_program(source).expect("Parse failed");
    let errors = semantic_validator::validate_program(&program, source);
    let validation_errors: Vec<_> = errors.iter().filter(|e| e.is_error()).collect();
    assert!(
        validation_errors.is_empty(),
        "Validation failed: {:?}",
        validation_errors
    );
    let json = serde_json::to_string(&program).expect("Program serialization failed");
    serde_json::from_str(&json).expect("Program deserialization failed")
}

/// Interpreter with `print` output captured
pub fn interpreter() -> Interpreter {
    Interpreter::default().with_captured_output()
}

/// Run a validated script, returning its completion value and printed output
pub fn run(source: &str) -> (Val, String) {
    let program = parse_validated(source);
    let mut interp = interpreter();
    let value = interp
        .run_program(&program, None)
        .unwrap_or_else(|err| panic!("Script failed: {}", err));
    (value, interp.take_output())
}

/// Completion value of a validated script
pub fn eval(source: &str) -> Val {
    run(source).0
}

/// Printed output of a validated script
pub fn output(source: &str) -> String {
    run(source).1
}

/// Run a script WITHOUT validation and return the error it raises
///
/// Use this for runtime errors that the validator would otherwise report
/// up front (e.g. a top-level `return`).
pub fn run_err(source: &str) -> ScriptError {
    match interpreter().run_source(source, None) {
        Ok(value) => panic!("Expected an error, script returned {:?}", value),
        Err(err) => err,
    }
}

/// Write `contents` to `dir/name`, creating parent directories
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create module directory");
    }
    fs::write(&path, contents).expect("Failed to write module");
    path
}

/// Serves module text from memory instead of the network
#[derive(Default)]
pub struct FakeFetcher {
    pub modules: HashMap<String, String>,
}

impl FakeFetcher {
    pub fn with(mut self, url: &str, source: &str) -> Self {
        self.modules.insert(url.to_string(), source.to_string());
        self
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<String, ModuleError> {
        self.modules
            .get(url)
            .cloned()
            .ok_or_else(|| ModuleError::Fetch {
                url: url.to_string(),
                message: "server responded with status 404".to_string(),
            })
    }
}
