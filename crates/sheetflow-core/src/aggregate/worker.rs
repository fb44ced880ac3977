//! Module: aggregate::worker
//! Responsibility: the aggregation lifecycle state machine and its typed
//! cycle guard.
//! Does not own: grouping or sheet layout (see `group`).
//! Boundary: every out-of-order call is a `ReuseViolation`, never ignored.

use crate::{
    aggregate::{AggregateError, AggregationType, state::ReducerState},
    obs::sink::{self, MetricsEvent},
    sheet::{Fields, FieldsMut},
    value::{Value, ValueType},
};
use std::fmt;

/// Input name that makes Count count every row.
pub const COUNT_ALL: &str = "*";

///
/// Phase
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Accumulating,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Accumulating => "accumulating",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

///
/// AggregationWorker
///
/// Reduces one run of rows into one output field.
///
/// Lifecycle: `init → accumulate* → write_out | discard → reset`.
/// `write_out` and `discard` both end the cycle; `init` may follow either
/// directly. `reset` returns to `Idle` from any phase.
///

#[derive(Clone, Debug)]
pub struct AggregationWorker {
    kind: AggregationType,
    input: Option<String>,
    output: String,
    output_as_decimal: bool,
    input_type: ValueType,
    phase: Phase,
    state: ReducerState,
}

impl AggregationWorker {
    /// Build a worker. For Count, an input of `*` (or none) counts every row;
    /// every other kind needs an input, checked when a cycle starts.
    /// `output_as_decimal` only affects Sum, Average, Max and Min.
    #[must_use]
    pub fn new(
        kind: AggregationType,
        input: Option<String>,
        output: impl Into<String>,
        output_as_decimal: bool,
    ) -> Self {
        let input = input
            .filter(|name| !name.is_empty())
            .filter(|name| !(kind == AggregationType::Count && name == COUNT_ALL));

        Self {
            kind,
            input,
            output: output.into(),
            output_as_decimal: output_as_decimal && kind.is_numeric(),
            input_type: ValueType::Text,
            phase: Phase::Idle,
            state: ReducerState::for_kind(kind),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> AggregationType {
        self.kind
    }

    #[must_use]
    pub fn input_field(&self) -> Option<&str> {
        self.input.as_deref()
    }

    #[must_use]
    pub fn output_field(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub const fn output_as_decimal(&self) -> bool {
        self.output_as_decimal
    }

    /// Type of the unknown First/Last write when nothing was captured.
    #[must_use]
    pub const fn with_input_type(mut self, input_type: ValueType) -> Self {
        self.input_type = input_type;
        self
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    ///
    /// LIFECYCLE
    ///

    /// Start a cycle.
    pub fn init(&mut self) -> Result<(), AggregateError> {
        if self.phase == Phase::Accumulating {
            return Err(self.reuse_violation("init"));
        }
        if self.input.is_none() && self.kind != AggregationType::Count {
            return Err(AggregateError::MissingInput { kind: self.kind });
        }
        self.state = ReducerState::for_kind(self.kind);
        self.phase = Phase::Accumulating;

        Ok(())
    }

    /// Fold one row. Rows whose input is missing or unknown are skipped.
    pub fn accumulate<F: Fields + ?Sized>(&mut self, row: &F) -> Result<(), AggregateError> {
        self.require_accumulating("accumulate")?;

        let Some(field) = self.input.as_deref() else {
            // Only Count is allowed to run without an input.
            self.state.count_row();
            self.record_row(false);
            return Ok(());
        };

        let value = match row.field(field) {
            Some(value) if !value.is_unknown() => value,
            _ => {
                log::trace!("{field} has no value to accumulate");
                self.record_row(true);
                return Ok(());
            }
        };

        match self.kind {
            AggregationType::Count => self.state.count_row(),
            AggregationType::First | AggregationType::Last => self.state.capture(self.kind, value),
            AggregationType::Sum
            | AggregationType::Average
            | AggregationType::Max
            | AggregationType::Min => {
                let number = self.numeric_input(field, value)?;
                self.state.add_numeric(self.kind, number);
            }
        }
        self.record_row(false);

        Ok(())
    }

    /// Write the cycle result to `output`, then end the cycle as `discard`
    /// does. First/Last with nothing captured write an unknown value.
    pub fn write_out<F: FieldsMut + ?Sized>(&mut self, output: &mut F) -> Result<(), AggregateError> {
        self.require_accumulating("writeOut")?;

        let value = self
            .state
            .clone()
            .finalize(self.kind)
            .into_value(self.output_as_decimal, self.input_type);
        output
            .set_field(&self.output, value)
            .map_err(|_| AggregateError::UnknownColumn {
                name: self.output.clone(),
            })?;
        self.finish(true);

        Ok(())
    }

    /// Drop the cycle's accumulation and end the cycle.
    pub fn discard(&mut self) -> Result<(), AggregateError> {
        self.require_accumulating("discard")?;
        self.finish(false);

        Ok(())
    }

    /// Clear all state and return to `Idle`. Legal from any phase.
    pub fn reset(&mut self) {
        self.state = ReducerState::for_kind(self.kind);
        self.phase = Phase::Idle;
    }

    /// Start a cycle and return a guard that ends it exactly once.
    pub fn begin(&mut self) -> Result<Cycle<'_>, AggregateError> {
        self.init()?;

        Ok(Cycle { worker: self })
    }

    ///
    /// INTERNAL
    ///

    fn finish(&mut self, written: bool) {
        self.state = ReducerState::for_kind(self.kind);
        self.phase = Phase::Finished;
        sink::record(MetricsEvent::CycleFinish {
            kind: self.kind,
            written,
        });
    }

    fn numeric_input(&self, field: &str, value: &Value) -> Result<f64, AggregateError> {
        value
            .to_decimal()
            .map_err(|_| AggregateError::IncompatibleType {
                kind: self.kind,
                field: field.to_string(),
                value_type: value.value_type(),
            })
    }

    fn require_accumulating(&self, operation: &'static str) -> Result<(), AggregateError> {
        if self.phase == Phase::Accumulating {
            Ok(())
        } else {
            Err(self.reuse_violation(operation))
        }
    }

    const fn reuse_violation(&self, operation: &'static str) -> AggregateError {
        AggregateError::ReuseViolation {
            kind: self.kind,
            operation,
            phase: self.phase,
        }
    }

    fn record_row(&self, skipped: bool) {
        sink::record(MetricsEvent::RowAccumulated {
            kind: self.kind,
            skipped,
        });
    }
}

///
/// Cycle
///
/// One in-progress accumulation. Consuming `write_out` or `discard` ends it;
/// dropping it unfinished discards.
///

#[derive(Debug)]
pub struct Cycle<'a> {
    worker: &'a mut AggregationWorker,
}

impl Cycle<'_> {
    pub fn accumulate<F: Fields + ?Sized>(&mut self, row: &F) -> Result<(), AggregateError> {
        self.worker.accumulate(row)
    }

    pub fn write_out<F: FieldsMut + ?Sized>(self, output: &mut F) -> Result<(), AggregateError> {
        self.worker.write_out(output)
    }

    pub fn discard(self) -> Result<(), AggregateError> {
        self.worker.discard()
    }

    #[must_use]
    pub const fn kind(&self) -> AggregationType {
        self.worker.kind
    }
}

impl Drop for Cycle<'_> {
    fn drop(&mut self) {
        if self.worker.phase == Phase::Accumulating {
            self.worker.finish(false);
        }
    }
}
