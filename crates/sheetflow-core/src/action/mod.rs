//! Module: action
//! Responsibility: the action contract, the control-flow outcome an action
//! reports, and the block that sequences actions.
//! Does not own: what actions do to the context (see `builtin` and caller
//! implementations).
//! Boundary: the block interprets outcomes; it never inspects business
//! messages.

mod block;
mod builtin;
mod configured;
mod error;

#[cfg(test)]
mod tests;

use crate::{context::ServiceContext, error::InternalError, value::Value};

// re-exports
pub use block::{ActionBlock, BlockOutcome};
pub use builtin::{
    AddMessage, AggregateSheet, CreateSheet, JumpTo, LogicAction, Loop, NestedBlock, RemoveValue,
    SetValue,
};
pub use configured::{ConfiguredAction, PostAction};
pub use error::BlockError;

///
/// CONSTANTS
///

/// Reserved result text that stops a block when returned through
/// [`ActionOutcome::from_signal`].
pub const STOP_SIGNAL: &str = "_stop";

/// Reserved jump target that leaves the innermost enclosing loop.
pub const BREAK_SIGNAL: &str = "_break";

/// Reserved jump target that skips to the next iteration of the innermost
/// enclosing loop.
pub const CONTINUE_SIGNAL: &str = "_continue";

/// Suffix of the context field an action's recorded result is stored under.
pub const RESULT_SUFFIX: &str = "Result";

/// Prefix of names generated for unnamed actions.
pub const GENERATED_NAME_PREFIX: &str = "_a";

///
/// ActionKind
///
/// Navigation actions return the name of the next action to run; for
/// ordinary actions the same text is just a result.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ActionKind {
    #[default]
    Ordinary,
    Navigation,
}

///
/// ActionOutcome
///
/// `Continue` moves to the next action of the block. `Break` and
/// `NextIteration` end the block early and are consumed by the innermost
/// [`Loop`].
///

#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    Continue,
    Stop,
    Break,
    NextIteration,
    JumpTo(String),
    Recorded(Value),
}

impl ActionOutcome {
    /// Map a nullable result onto an outcome.
    ///
    /// `None` continues, the text `_stop` stops, any other result is a jump
    /// target for navigation actions and a recorded result otherwise.
    /// Navigation results `_break` and `_continue` are loop signals.
    #[must_use]
    pub fn from_signal(result: Option<Value>, kind: ActionKind) -> Self {
        let Some(value) = result else {
            return Self::Continue;
        };

        if value.as_text() == Some(STOP_SIGNAL) {
            return Self::Stop;
        }

        match kind {
            ActionKind::Navigation => Self::jump(value.format()),
            ActionKind::Ordinary => Self::Recorded(value),
        }
    }

    /// Jump to `target`, resolving the reserved signal names.
    #[must_use]
    pub fn jump(target: impl Into<String>) -> Self {
        let target = target.into();
        match target.as_str() {
            STOP_SIGNAL => Self::Stop,
            BREAK_SIGNAL => Self::Break,
            CONTINUE_SIGNAL => Self::NextIteration,
            _ => Self::JumpTo(target),
        }
    }

    #[must_use]
    pub fn recorded(value: impl Into<Value>) -> Self {
        Self::Recorded(value.into())
    }
}

///
/// Action
///
/// One step of a block. Implementations are stateless between calls; all
/// per-request state lives in the context.
///

pub trait Action {
    /// Name used for jump targets and the `<name>Result` field. An empty name
    /// is replaced by a generated one when the block is built.
    fn name(&self) -> &str {
        ""
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Ordinary
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError>;
}

impl<A: Action + ?Sized> Action for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> ActionKind {
        (**self).kind()
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        (**self).act(ctx)
    }
}
