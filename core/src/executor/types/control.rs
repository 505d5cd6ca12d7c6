//! Execution frame types

use std::rc::Rc;

use super::ast::{Stmt, StmtRef};
use super::values::Val;
use crate::executor::environment::EnvId;

/* ===================== Frames ===================== */

/// Frame kind
#[derive(Debug, Clone)]
pub enum FrameKind {
    /// A statement waiting to be executed
    Statement,
    /// An active `while` or `for` loop
    ///
    /// The loop frame stays on the stack for its whole lifetime; each
    /// iteration pushes the body above it. `items` holds the snapshot a
    /// `for` loop iterates over.
    Loop {
        iteration: usize,
        items: Option<Rc<Vec<Val>>>,
    },
}

/// Execution frame: a statement paired with the environment it runs in
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub env: EnvId,
    pub node: StmtRef,
}

impl Frame {
    pub fn statement(env: EnvId, node: StmtRef) -> Self {
        Self {
            kind: FrameKind::Statement,
            env,
            node,
        }
    }

    pub fn loop_frame(env: EnvId, node: StmtRef, items: Option<Rc<Vec<Val>>>) -> Self {
        Self {
            kind: FrameKind::Loop {
                iteration: 0,
                items,
            },
            env,
            node,
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self.kind, FrameKind::Statement) && matches!(*self.node, Stmt::Continue { .. })
    }
}
