use crate::value::ValueType;
use thiserror::Error as ThisError;

///
/// SheetError
///
/// Structural failures raised while building, mutating, linking, or decoding
/// a data sheet.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SheetError {
    #[error("duplicate column name '{name}'")]
    DuplicateColumn { name: String },

    #[error("column '{name}' is not found in data sheet")]
    UnknownColumn { name: String },

    #[error("row has {found} cells but the sheet has {expected} columns")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("column {index} has type {found} where {expected} is required")]
    ColumnTypeMismatch {
        index: usize,
        expected: ValueType,
        found: ValueType,
    },

    #[error("column index {index} is out of range for a sheet of width {width}")]
    ColumnIndexOutOfRange { index: usize, width: usize },

    #[error("link has {parent} parent key columns but {child} child key columns")]
    LinkKeyMismatch { parent: usize, child: usize },

    #[error("invalid data sheet json: {message}")]
    InvalidJson { message: String },
}
