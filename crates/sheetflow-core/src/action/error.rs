//! Module: action::error
//! Responsibility: block-level configuration faults.
//! Does not own: failures raised inside individual actions.
//! Boundary: every variant is fatal to the block invocation.

use thiserror::Error as ThisError;

///
/// BlockError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BlockError {
    #[error("action name '{name}' is used more than once in the block")]
    DuplicateActionName { name: String },

    #[error("action '{from}' jumps to '{target}', which is not an action in this block")]
    UnknownJumpTarget { target: String, from: String },

    #[error("block exceeded its budget of {limit} action steps")]
    StepLimitExceeded { limit: u64 },

    #[error("loop '{name}' exceeded its budget of {limit} iterations")]
    IterationLimitExceeded { name: String, limit: u64 },

    #[error("loop copies column '{column}', which is not in sheet '{sheet}'")]
    UnknownLoopColumn { column: String, sheet: String },
}
