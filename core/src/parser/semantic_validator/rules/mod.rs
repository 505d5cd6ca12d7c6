//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `control_flow_placement.rs` - return/break/continue where they cannot run
//! - `unreachable_code.rs` - Code that can never execute

mod control_flow_placement;
mod unreachable_code;

pub use control_flow_placement::ControlFlowPlacementRule;
pub use unreachable_code::UnreachableCodeRule;
