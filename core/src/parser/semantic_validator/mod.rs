//! Semantic Validation for Tempo Programs
//!
//! This module provides a rule-based validation pass that runs after parsing
//! to catch mistakes the grammar can't enforce. The evaluator performs the
//! same checks at runtime; validation reports them before anything runs.
//!
//! # Usage
//!
//! ```ignore
//! use tempo_core::parser::{parse_program, semantic_validator::validate_program};
//!
//! let program = parse_program(source)?;
//! let errors = validate_program(&program, source);
//! if !errors.is_empty() {
//!     // Handle validation errors
//! }
//! ```
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule implements this trait
//! 2. **Validator** - Collects and runs all rules
//! 3. **ValidationError** - The output of validation (errors, warnings, hints)
//!
//! New rules live in `semantic_validator/rules/` and are registered in
//! `Validator::new()`.

pub mod rules;

use serde::Serialize;

use crate::executor::types::{Expr, FuncDecl, Program, Span};

// ============================================================================
// Validation Error Types
// ============================================================================

/// A validation error produced by semantic analysis.
///
/// This type is independent of any specific output format so it can be used
/// by both the CLI and tests.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// The source location of the issue
    pub span: Span,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Which rule produced this error
    pub rule_id: &'static str,
}

/// Severity levels for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Must be fixed - the program fails when it reaches this code
    Error,
    /// Should probably be fixed - potential bug
    Warning,
    /// Suggestion for improvement
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        }
    }
}

impl ValidationError {
    /// Create a new error
    pub fn error(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    /// Create a new warning
    pub fn warning(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            severity: Severity::Warning,
            rule_id,
        }
    }

    /// Create a new hint
    #[allow(dead_code)]
    pub fn hint(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            severity: Severity::Hint,
            rule_id,
        }
    }

    /// Check if this is an error (not a warning or hint)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}: {} [{}]",
            self.severity.as_str(),
            self.span,
            self.message,
            self.rule_id
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules must implement.
///
/// Each rule checks one specific aspect of the program and must not depend
/// on other rules' results.
pub trait ValidationRule {
    /// Unique identifier for this rule (e.g., "unreachable-code")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the validation and return any errors found.
    fn validate(&self, program: &Program, source: &str) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

/// The main validator that orchestrates all validation rules.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a new validator with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::ControlFlowPlacementRule),
                Box::new(rules::UnreachableCodeRule),
            ],
        }
    }

    /// Run all validation rules and collect errors.
    pub fn validate(&self, program: &Program, source: &str) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(program, source))
            .collect();
        errors.sort_by_key(|e| e.span.start);
        errors
    }

    /// Get a list of all registered rules
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// AST Helpers
// ============================================================================

/// Function literals appearing anywhere inside `expr`, outermost first
pub(crate) fn nested_functions<'a>(expr: &'a Expr, out: &mut Vec<&'a FuncDecl>) {
    match expr {
        Expr::Func { decl, .. } => out.push(decl),
        Expr::LitList { elements, .. } => {
            for e in elements {
                nested_functions(e, out);
            }
        }
        Expr::LitObj { properties, .. } => {
            for (_, _, e) in properties {
                nested_functions(e, out);
            }
        }
        Expr::Member { object, .. } => nested_functions(object, out),
        Expr::Index { object, index, .. } => {
            nested_functions(object, out);
            nested_functions(index, out);
        }
        Expr::Call { callee, args, .. } => {
            nested_functions(callee, out);
            for a in args {
                nested_functions(a, out);
            }
        }
        Expr::Binary { left, right, .. } => {
            nested_functions(left, out);
            nested_functions(right, out);
        }
        Expr::Unary { operand, .. } => nested_functions(operand, out),
        Expr::LitBool { .. }
        | Expr::LitInt { .. }
        | Expr::LitFloat { .. }
        | Expr::LitStr { .. }
        | Expr::LitNil { .. }
        | Expr::Ident { .. } => {}
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a program and return everything found, ordered by position.
pub fn validate_program(program: &Program, source: &str) -> Vec<ValidationError> {
    Validator::new().validate(program, source)
}

/// Check if a program has any validation errors (not just warnings).
pub fn has_errors(program: &Program, source: &str) -> bool {
    validate_program(program, source)
        .iter()
        .any(|e| e.is_error())
}

#[cfg(test)]
mod tests;
