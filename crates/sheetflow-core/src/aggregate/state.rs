//! Module: aggregate::state
//! Responsibility: per-kind reducer state and its update/finalize rules.
//! Does not own: lifecycle phase checks (see `worker`).
//! Boundary: callers hand in known values only; unknowns never reach here.

use crate::{
    aggregate::AggregationType,
    value::{Value, ValueType, round_half_up},
};

///
/// ReducerState
///
/// Accumulator for one cycle. Sum and Average share the running total;
/// Min and Max keep an optional extremum so the first real value always wins.
///

#[derive(Clone, Debug, PartialEq)]
pub(super) enum ReducerState {
    Total { total: f64, count: u64 },
    Extremum(Option<f64>),
    Count(u64),
    Capture(Option<Value>),
}

///
/// Reduced
///
/// Finalized cycle output before it is written to a row.
///

#[derive(Debug, PartialEq)]
pub(super) enum Reduced {
    Numeric(f64),
    Count(u64),
    Captured(Option<Value>),
}

impl ReducerState {
    /// Fresh state for one reducer kind.
    #[must_use]
    pub(super) const fn for_kind(kind: AggregationType) -> Self {
        match kind {
            AggregationType::Sum | AggregationType::Average => Self::Total {
                total: 0.0,
                count: 0,
            },
            AggregationType::Max | AggregationType::Min => Self::Extremum(None),
            AggregationType::Count => Self::Count(0),
            AggregationType::First | AggregationType::Last => Self::Capture(None),
        }
    }

    pub(super) const fn count_row(&mut self) {
        if let Self::Count(count) = self {
            *count = count.saturating_add(1);
        }
    }

    pub(super) fn add_numeric(&mut self, kind: AggregationType, value: f64) {
        match self {
            Self::Total { total, count } => {
                *total += value;
                *count = count.saturating_add(1);
            }
            Self::Extremum(current) => {
                let replace = match *current {
                    None => true,
                    Some(held) if kind == AggregationType::Max => value > held,
                    Some(held) => value < held,
                };
                if replace {
                    *current = Some(value);
                }
            }
            Self::Count(_) | Self::Capture(_) => {}
        }
    }

    pub(super) fn capture(&mut self, kind: AggregationType, value: &Value) {
        if let Self::Capture(held) = self {
            if kind == AggregationType::Last || held.is_none() {
                *held = Some(value.clone());
            }
        }
    }

    #[expect(clippy::cast_precision_loss)]
    pub(super) fn finalize(self, kind: AggregationType) -> Reduced {
        match self {
            Self::Total { total, count } => {
                if count == 0 {
                    Reduced::Numeric(0.0)
                } else if kind == AggregationType::Average {
                    Reduced::Numeric(total / count as f64)
                } else {
                    Reduced::Numeric(total)
                }
            }
            Self::Extremum(held) => Reduced::Numeric(held.unwrap_or(0.0)),
            Self::Count(count) => Reduced::Count(count),
            Self::Capture(held) => Reduced::Captured(held),
        }
    }
}

impl Reduced {
    /// Typed output value. Non-finite totals and empty captures become
    /// unknown values so a stale output is always overwritten.
    #[must_use]
    pub(super) fn into_value(self, output_as_decimal: bool, input_type: ValueType) -> Value {
        match self {
            Self::Numeric(n) if !n.is_finite() => Value::unknown(if output_as_decimal {
                ValueType::Decimal
            } else {
                ValueType::Integer
            }),
            Self::Numeric(n) if output_as_decimal => Value::decimal(n),
            Self::Numeric(n) => Value::integer(round_half_up(n)),
            Self::Count(c) => Value::integer(i64::try_from(c).unwrap_or(i64::MAX)),
            Self::Captured(v) => v.unwrap_or(Value::unknown(input_type)),
        }
    }
}
