pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod lexer;
pub mod modules;
pub mod parser;
pub mod task;

// Re-export main types
pub use config::Config;
pub use errors::{ErrorKind, ScriptError, ScriptResult};
pub use executor::{Interpreter, Program, Val};
