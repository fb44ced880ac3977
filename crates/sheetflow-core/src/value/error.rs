use crate::value::ValueType;
use thiserror::Error as ThisError;

///
/// ValueError
///
/// Narrowing failures raised by the typed accessors on `Value`.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValueError {
    #[error("type mismatch: a {found} value cannot be used as {expected}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    #[error("value of type {value_type} is unknown")]
    UnknownValue { value_type: ValueType },

    #[error("non-finite decimal has no integer form")]
    NonFinite,
}
