//! Module: aggregate::error
//! Responsibility: aggregation failure taxonomy.
//! Does not own: business messages; skipped rows are not errors.
//! Boundary: every variant is a hard fault surfaced to the caller.

use crate::{
    aggregate::{AggregationType, Phase},
    value::ValueType,
};
use thiserror::Error as ThisError;

///
/// AggregateError
///
/// Lifecycle misuse and type faults raised by aggregation workers.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AggregateError {
    #[error("{kind} aggregation of field '{field}' cannot accept a {value_type} value")]
    IncompatibleType {
        kind: AggregationType,
        field: String,
        value_type: ValueType,
    },

    #[error(
        "{kind} aggregator called {operation} while {phase}; the call sequence is init, accumulate*, writeOut|discard, reset"
    )]
    ReuseViolation {
        kind: AggregationType,
        operation: &'static str,
        phase: Phase,
    },

    #[error("aggregation column '{name}' is not available")]
    UnknownColumn { name: String },

    #[error("{kind} aggregation needs an input field")]
    MissingInput { kind: AggregationType },
}
