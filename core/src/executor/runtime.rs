//! Per-interpreter execution context
//!
//! The runtime owns the call stack together with the two marker stacks used
//! to scope control flow:
//!
//! - a function marker is the stack cursor at function entry; `return`
//!   truncates the stack back to it
//! - an iteration marker is the stack cursor at loop entry (the loop frame
//!   sits just above it); `break` truncates to it, `continue` truncates to the
//!   loop frame itself
//!
//! A `break`/`continue` is valid only when the innermost iteration marker is
//! not below the innermost function marker, i.e. the loop belongs to the
//! currently executing function.

use std::mem;

use super::call_stack::CallStack;
use super::types::{Span, Val};
use crate::errors::{ScriptError, ScriptResult};
use crate::modules::ModuleOrigin;

/// Result of a single `resume()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done,
}

#[derive(Debug, Default)]
pub struct Runtime {
    pub stack: CallStack,
    function_frames: Vec<isize>,
    iteration_frames: Vec<isize>,
    pub is_return: bool,
    pub is_break: bool,
    pub is_continue: bool,
    /// Value of the most recent `return`
    pub last_result: Val,
    /// Value of the last top-level expression statement
    pub completion: Val,
    origins: Vec<ModuleOrigin>,
}

/// Importer state parked while a module body runs
#[derive(Debug)]
pub struct SavedState {
    cursor: isize,
    function_frames: Vec<isize>,
    iteration_frames: Vec<isize>,
    is_return: bool,
    is_break: bool,
    is_continue: bool,
    last_result: Val,
    completion: Val,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all execution state between independent top-level runs
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /* ===================== Function Markers ===================== */

    pub fn enter_function(&mut self) -> isize {
        let marker = self.stack.cursor();
        self.function_frames.push(marker);
        marker
    }

    /// Pop the function marker after the body ran to completion without `return`
    pub fn leave_function(&mut self, marker: isize) {
        if self.function_frames.last() == Some(&marker) {
            self.function_frames.pop();
        }
        self.iteration_frames.retain(|m| *m < marker);
    }

    pub fn function_depth(&self) -> usize {
        self.function_frames.len()
    }

    /// Unwind a `return` back to the caller's frame
    pub fn unwind_return(&mut self, span: Span) -> ScriptResult<()> {
        let marker = self
            .function_frames
            .pop()
            .ok_or_else(|| ScriptError::control_flow("return outside function body", span))?;
        self.iteration_frames.retain(|m| *m < marker);
        self.stack.set_cursor(marker);
        Ok(())
    }

    /* ===================== Iteration Markers ===================== */

    pub fn enter_loop(&mut self) -> isize {
        let marker = self.stack.cursor();
        self.iteration_frames.push(marker);
        marker
    }

    pub fn leave_loop(&mut self) {
        self.iteration_frames.pop();
    }

    pub fn loop_depth(&self) -> usize {
        self.iteration_frames.len()
    }

    /// Innermost iteration marker, if it belongs to the current function
    fn innermost_loop(&self, keyword: &str, span: Span) -> ScriptResult<isize> {
        let loop_marker = self.iteration_frames.last().copied();
        let function_marker = self.function_frames.last().copied();
        let marker = match (loop_marker, function_marker) {
            (Some(l), Some(f)) if l < f => None,
            (marker, _) => marker,
        };
        marker.ok_or_else(|| ScriptError::control_flow(format!("{} outside loop body", keyword), span))
    }

    pub fn unwind_break(&mut self, span: Span) -> ScriptResult<()> {
        let marker = self.innermost_loop("break", span)?;
        self.iteration_frames.pop();
        self.stack.set_cursor(marker);
        Ok(())
    }

    pub fn unwind_continue(&mut self, span: Span) -> ScriptResult<()> {
        let marker = self.innermost_loop("continue", span)?;
        self.stack.set_cursor(marker + 1);
        Ok(())
    }

    /* ===================== Reentrancy ===================== */

    /// Park the current run's markers, flags and values so a module body can
    /// run on the same stack with a clean slate
    pub fn save(&mut self) -> SavedState {
        let saved = SavedState {
            cursor: self.stack.cursor(),
            function_frames: mem::take(&mut self.function_frames),
            iteration_frames: mem::take(&mut self.iteration_frames),
            is_return: self.is_return,
            is_break: self.is_break,
            is_continue: self.is_continue,
            last_result: mem::take(&mut self.last_result),
            completion: mem::take(&mut self.completion),
        };
        self.is_return = false;
        self.is_break = false;
        self.is_continue = false;
        saved
    }

    pub fn restore(&mut self, saved: SavedState) {
        self.stack.set_cursor(saved.cursor);
        self.function_frames = saved.function_frames;
        self.iteration_frames = saved.iteration_frames;
        self.is_return = saved.is_return;
        self.is_break = saved.is_break;
        self.is_continue = saved.is_continue;
        self.last_result = saved.last_result;
        self.completion = saved.completion;
    }

    /* ===================== Origins ===================== */

    pub fn push_origin(&mut self, origin: ModuleOrigin) {
        self.origins.push(origin);
    }

    pub fn pop_origin(&mut self) -> Option<ModuleOrigin> {
        self.origins.pop()
    }

    /// File or module whose code is currently executing
    pub fn current_origin(&self) -> Option<&ModuleOrigin> {
        self.origins.last()
    }
}
