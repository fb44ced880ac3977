//! Core runtime for sheetflow: typed values, data sheets, the service
//! context, action blocks, and streaming aggregation, with the ergonomics
//! exported via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod action;
pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod obs;
pub mod sheet;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, configuration, or metrics helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        action::{Action, ActionBlock, ActionKind, ActionOutcome, BlockOutcome},
        aggregate::{AggregationType, AggregationWorker, Aggregator, GroupAggregation},
        context::{MessageKind, ServiceContext},
        sheet::{DataSheet, Fields, FieldsMut},
        value::{Value, ValueType},
    };
}
