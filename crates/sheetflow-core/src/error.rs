use crate::{
    action::BlockError, aggregate::AggregateError, config::ConfigError, sheet::SheetError,
    value::ValueError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Every hard failure of the engine surfaces as one of these; business
/// messages never do (they accumulate in the service context instead).
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without a typed detail payload.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct an action-origin internal error.
    ///
    /// Used by custom actions that fail for reasons outside the engine taxonomy.
    pub fn action_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Action, message)
    }

    /// Construct a context-origin not-found error.
    pub(crate) fn context_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, ErrorOrigin::Context, message)
    }

    /// Configuration faults indicate a static defect in the action/aggregation
    /// metadata and are never worth retrying.
    #[must_use]
    pub const fn is_configuration_fault(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn block_error(&self) -> Option<&BlockError> {
        match &self.detail {
            Some(ErrorDetail::Block(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn aggregate_error(&self) -> Option<&AggregateError> {
        match &self.detail {
            Some(ErrorDetail::Aggregate(err)) => Some(err),
            _ => None,
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Value(ValueError),
    #[error("{0}")]
    Sheet(SheetError),
    #[error("{0}")]
    Block(BlockError),
    #[error("{0}")]
    Aggregate(AggregateError),
    #[error("{0}")]
    Config(ConfigError),
}

impl From<ValueError> for InternalError {
    fn from(err: ValueError) -> Self {
        Self {
            class: ErrorClass::TypeMismatch,
            origin: ErrorOrigin::Value,
            message: err.to_string(),
            detail: Some(ErrorDetail::Value(err)),
        }
    }
}

impl From<SheetError> for InternalError {
    fn from(err: SheetError) -> Self {
        let class = match err {
            SheetError::UnknownColumn { .. } => ErrorClass::NotFound,
            _ => ErrorClass::InvariantViolation,
        };

        Self {
            class,
            origin: ErrorOrigin::Sheet,
            message: err.to_string(),
            detail: Some(ErrorDetail::Sheet(err)),
        }
    }
}

impl From<BlockError> for InternalError {
    fn from(err: BlockError) -> Self {
        Self {
            class: ErrorClass::Configuration,
            origin: ErrorOrigin::Block,
            message: err.to_string(),
            detail: Some(ErrorDetail::Block(err)),
        }
    }
}

impl From<AggregateError> for InternalError {
    fn from(err: AggregateError) -> Self {
        let class = match err {
            AggregateError::IncompatibleType { .. } => ErrorClass::TypeMismatch,
            AggregateError::ReuseViolation { .. } | AggregateError::MissingInput { .. } => {
                ErrorClass::Configuration
            }
            AggregateError::UnknownColumn { .. } => ErrorClass::NotFound,
        };

        Self {
            class,
            origin: ErrorOrigin::Aggregate,
            message: err.to_string(),
            detail: Some(ErrorDetail::Aggregate(err)),
        }
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self {
            class: ErrorClass::Configuration,
            origin: ErrorOrigin::Config,
            message: err.to_string(),
            detail: Some(ErrorDetail::Config(err)),
        }
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Configuration,
    TypeMismatch,
    InvariantViolation,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::TypeMismatch => "type_mismatch",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Value,
    Sheet,
    Context,
    Block,
    Action,
    Aggregate,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Value => "value",
            Self::Sheet => "sheet",
            Self::Context => "context",
            Self::Block => "block",
            Self::Action => "action",
            Self::Aggregate => "aggregate",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
