//! Error types surfaced by the interpreter
//!
//! Every failure is fatal to the current run and is reported as a single
//! [`ScriptError`]: a kind tag, a message, the span where it was raised (when
//! known) and a trace of the files and modules it propagated through,
//! innermost first.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::executor::types::Span;

/// Error kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    LexicalError,
    SyntaxError,
    UnresolvedIdentifier,
    ControlFlowError,
    ImportError,
    ArgumentError,
    FunctionCallError,
    /// Operator or property misuse
    TypeError,
    /// Integer division or modulo by zero
    ArithmeticError,
    /// Function nesting beyond `interpreter.max_call_depth`
    CallDepthError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::LexicalError => "LexicalError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::UnresolvedIdentifier => "UnresolvedIdentifier",
            ErrorKind::ControlFlowError => "ControlFlowError",
            ErrorKind::ImportError => "ImportError",
            ErrorKind::ArgumentError => "ArgumentError",
            ErrorKind::FunctionCallError => "FunctionCallError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ArithmeticError => "ArithmeticError",
            ErrorKind::CallDepthError => "CallDepthError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal script error
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.render())]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    /// Originating file/module identifiers, innermost first
    pub trace: Vec<String>,
}

pub type ScriptResult<T> = Result<T, ScriptError>;

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            trace: Vec::new(),
        }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self::new(kind, message).with_span(span)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Record that the error propagated out of `origin`
    pub fn traced(mut self, origin: &str) -> Self {
        if self.trace.last().map(String::as_str) != Some(origin) {
            self.trace.push(origin.to_string());
        }
        self
    }

    pub fn unresolved(name: &str, span: Span) -> Self {
        Self::at(
            ErrorKind::UnresolvedIdentifier,
            format!("'{}' is not defined", name),
            span,
        )
    }

    pub fn control_flow(message: impl Into<String>, span: Span) -> Self {
        Self::at(ErrorKind::ControlFlowError, message, span)
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::at(ErrorKind::TypeError, message, span)
    }

    pub fn argument(function: &str, message: impl fmt::Display, span: Span) -> Self {
        Self::at(
            ErrorKind::ArgumentError,
            format!("{}: {}", function, message),
            span,
        )
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImportError, message)
    }

    /// Origin where the error was first raised
    pub fn origin(&self) -> Option<&str> {
        self.trace.first().map(String::as_str)
    }

    fn render(&self) -> String {
        let mut out = format!("{}: {}", self.kind, self.message);
        if let Some(span) = &self.span {
            match self.origin() {
                Some(origin) => out.push_str(&format!(" ({}:{}:{})", origin, span.line(), span.column())),
                None => out.push_str(&format!(" ({})", span)),
            }
        }
        for origin in self.trace.iter().skip(1) {
            out.push_str(&format!("\n  imported from {}", origin));
        }
        out
    }
}
