//! Tests for the executor
//!
//! Organized by feature area

mod helpers;
mod import_tests;
mod scope_tests;
