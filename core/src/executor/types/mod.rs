//! Core types for the evaluator

pub mod ast;
pub mod control;
pub mod values;

pub use ast::{
    AssignOp, BinaryOp, Expr, FuncDecl, ImportBinding, MemberAccess, Program, Span, Stmt,
    StmtRef, UnaryOp,
};
pub use control::{Frame, FrameKind};
pub use values::{json_to_val, val_to_json, Closure, NativeFunc, ObjMap, Val};
