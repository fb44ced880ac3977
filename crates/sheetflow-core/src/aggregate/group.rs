//! Module: aggregate::group
//! Responsibility: drive one worker cycle per contiguous group of a sorted
//! sheet and collect the summary rows.
//! Does not own: reducer semantics (see `worker`/`state`).
//! Boundary: output layout is group key columns, then aggregator outputs.

use crate::{
    aggregate::{AggregateError, AggregationType, Aggregator, AggregationWorker, Cycle},
    error::InternalError,
    sheet::{Column, DataSheet, FieldsMut},
    value::ValueType,
};
use std::ops::Range;

///
/// GroupAggregation
///
/// Summarizes an input sheet that is sorted by `group_keys`.
/// With no group keys the whole sheet is one group and exactly one summary
/// row is produced, even for an empty input.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupAggregation {
    group_keys: Vec<String>,
    aggregators: Vec<Aggregator>,
}

impl GroupAggregation {
    #[must_use]
    pub const fn new(group_keys: Vec<String>, aggregators: Vec<Aggregator>) -> Self {
        Self {
            group_keys,
            aggregators,
        }
    }

    #[must_use]
    pub fn group_keys(&self) -> &[String] {
        &self.group_keys
    }

    #[must_use]
    pub fn aggregators(&self) -> &[Aggregator] {
        &self.aggregators
    }

    /// Column layout of the summary sheet for `input`.
    pub fn output_columns(&self, input: &DataSheet) -> Result<Vec<Column>, InternalError> {
        let mut columns = Vec::with_capacity(self.group_keys.len() + self.aggregators.len());

        for key in &self.group_keys {
            let idx = input_column(input, key)?;
            columns.push(input.columns()[idx].clone());
        }

        for agg in &self.aggregators {
            let value_type = match agg.aggregation {
                AggregationType::Count => ValueType::Integer,
                AggregationType::First | AggregationType::Last => {
                    let name = agg.reads_input().ok_or(AggregateError::MissingInput {
                        kind: agg.aggregation,
                    })?;
                    input.columns()[input_column(input, name)?].value_type
                }
                _ if agg.output_as_decimal => ValueType::Decimal,
                _ => ValueType::Integer,
            };
            columns.push(Column::new(agg.output_field.clone(), value_type));
        }

        Ok(columns)
    }

    /// Summarize `input` into a new sheet.
    pub fn run(&self, input: &DataSheet) -> Result<DataSheet, InternalError> {
        self.check_inputs(input)?;

        let key_indexes = input.column_indexes(&self.group_keys)?;
        let mut output = DataSheet::new(self.output_columns(input)?)?;
        let mut workers: Vec<AggregationWorker> = self
            .aggregators
            .iter()
            .map(|agg| typed_worker(agg, input))
            .collect();

        for run in self.runs(input, &key_indexes)? {
            let mut cycles = workers
                .iter_mut()
                .map(AggregationWorker::begin)
                .collect::<Result<Vec<Cycle<'_>>, _>>()?;

            for idx in run.clone() {
                let Some(row) = input.row_view(idx) else {
                    continue;
                };
                for cycle in &mut cycles {
                    cycle.accumulate(&row)?;
                }
            }

            let mut out = output.append_unknown_row();
            if let Some(first) = input.row(run.start) {
                for (key, &idx) in self.group_keys.iter().zip(&key_indexes) {
                    out.set_field(key, first[idx].clone())?;
                }
            }
            for cycle in cycles {
                cycle.write_out(&mut out)?;
            }
        }

        log::debug!(
            "aggregated {} input rows into {} summary rows",
            input.length(),
            output.length()
        );

        Ok(output)
    }

    /// Run every aggregator over all rows of `input`, writing results into
    /// `target`. Group keys are ignored.
    pub fn summarize_into<F: FieldsMut + ?Sized>(
        &self,
        input: &DataSheet,
        target: &mut F,
    ) -> Result<(), InternalError> {
        self.check_inputs(input)?;

        for agg in &self.aggregators {
            let mut worker = typed_worker(agg, input);
            let mut cycle = worker.begin()?;
            for row in input.rows() {
                cycle.accumulate(&row)?;
            }
            cycle.write_out(&mut *target)?;
        }

        Ok(())
    }

    fn runs(&self, input: &DataSheet, key_indexes: &[usize]) -> Result<Vec<Range<usize>>, InternalError> {
        let mut runs = input.group_runs(key_indexes)?;
        if runs.is_empty() && self.group_keys.is_empty() {
            runs.push(0..0);
        }

        Ok(runs)
    }

    fn check_inputs(&self, input: &DataSheet) -> Result<(), InternalError> {
        for agg in &self.aggregators {
            match agg.reads_input() {
                Some(name) => {
                    input_column(input, name)?;
                }
                None if agg.aggregation != AggregationType::Count => {
                    return Err(AggregateError::MissingInput {
                        kind: agg.aggregation,
                    }
                    .into());
                }
                None => {}
            }
        }

        Ok(())
    }
}

/// Worker whose empty First/Last output carries the input column's type.
fn typed_worker(agg: &Aggregator, input: &DataSheet) -> AggregationWorker {
    let worker = agg.worker();
    match agg.reads_input().and_then(|name| input.column_index(name)) {
        Some(idx) => worker.with_input_type(input.columns()[idx].value_type),
        None => worker,
    }
}

fn input_column(input: &DataSheet, name: &str) -> Result<usize, AggregateError> {
    input
        .column_index(name)
        .ok_or_else(|| AggregateError::UnknownColumn {
            name: name.to_string(),
        })
}
