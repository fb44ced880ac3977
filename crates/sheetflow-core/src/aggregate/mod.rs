//! Module: aggregate
//! Responsibility: streaming per-group reducers (sum, average, count, min,
//! max, first, last) and the sheet-level grouping driver.
//! Does not own: sorting; input sheets must already be ordered by group key.
//! Boundary: consumes rows through `Fields`, writes through `FieldsMut`.

mod error;
mod group;
mod state;
mod worker;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use error::AggregateError;
pub use group::GroupAggregation;
pub use worker::{AggregationWorker, COUNT_ALL, Cycle, Phase};

///
/// AggregationType
///
/// Selects the reducer an [`AggregationWorker`] runs.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    Sum,
    Average,
    Count,
    Max,
    Min,
    First,
    Last,
}

impl AggregationType {
    pub const ALL: [Self; 7] = [
        Self::Sum,
        Self::Average,
        Self::Count,
        Self::Max,
        Self::Min,
        Self::First,
        Self::Last,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Count => "count",
            Self::Max => "max",
            Self::Min => "min",
            Self::First => "first",
            Self::Last => "last",
        }
    }

    /// Reducers that fold numeric input and honor `output_as_decimal`.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Sum | Self::Average | Self::Max | Self::Min)
    }

    /// Build a fresh worker of this kind.
    #[must_use]
    pub fn worker(
        self,
        input: Option<&str>,
        output: impl Into<String>,
        output_as_decimal: bool,
    ) -> AggregationWorker {
        AggregationWorker::new(self, input.map(str::to_string), output, output_as_decimal)
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// Aggregator
///
/// Declarative description of one output column/field of an aggregation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Aggregator {
    pub aggregation: AggregationType,
    #[serde(default)]
    pub input_field: Option<String>,
    pub output_field: String,
    #[serde(default)]
    pub output_as_decimal: bool,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        aggregation: AggregationType,
        input_field: Option<&str>,
        output_field: impl Into<String>,
    ) -> Self {
        Self {
            aggregation,
            input_field: input_field.map(str::to_string),
            output_field: output_field.into(),
            output_as_decimal: false,
        }
    }

    #[must_use]
    pub const fn as_decimal(mut self) -> Self {
        self.output_as_decimal = true;
        self
    }

    /// Input column this aggregator reads, if it reads one.
    #[must_use]
    pub fn reads_input(&self) -> Option<&str> {
        self.input_field
            .as_deref()
            .filter(|name| !name.is_empty())
            .filter(|name| !(self.aggregation == AggregationType::Count && *name == COUNT_ALL))
    }

    /// Build a fresh worker for one aggregation run.
    #[must_use]
    pub fn worker(&self) -> AggregationWorker {
        self.aggregation.worker(
            self.input_field.as_deref(),
            self.output_field.clone(),
            self.output_as_decimal,
        )
    }
}
