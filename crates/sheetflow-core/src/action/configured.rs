//! Module: action::configured
//! Responsibility: run-conditions and success/failure post-processing
//! wrapped around any action.
//! Does not own: the wrapped action's behavior.
//! Boundary: a skipped action continues the block and records nothing.

use crate::{
    action::{Action, ActionKind, ActionOutcome},
    context::{Message, ServiceContext},
    error::InternalError,
    value::Value,
};

///
/// PostAction
///
/// What to do after the wrapped action succeeded or failed. Navigation wins
/// over the message when both are set.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PostAction {
    pub navigate_to: Option<String>,
    pub message: Option<Message>,
}

impl PostAction {
    #[must_use]
    pub fn navigate(target: impl Into<String>) -> Self {
        Self {
            navigate_to: Some(target.into()),
            message: None,
        }
    }

    #[must_use]
    pub const fn message(message: Message) -> Self {
        Self {
            navigate_to: None,
            message: Some(message),
        }
    }

    const fn is_set(&self) -> bool {
        self.navigate_to.is_some() || self.message.is_some()
    }
}

///
/// ConfiguredAction
///
/// Wraps an action with the declarative knobs every action may carry.
///
/// The action runs only when all configured conditions hold:
/// `execute_on_condition` names a field whose value is read as a boolean
/// (missing is false), `execute_if_rows_in_sheet` needs at least one row and
/// `execute_if_no_rows_in_sheet` needs none.
///
/// With post-processing configured, `Continue` and truthy recorded results
/// count as success; `Stop` and navigation jumps pass through untouched.
///

pub struct ConfiguredAction<A> {
    inner: A,
    execute_on_condition: Option<String>,
    execute_if_rows_in_sheet: Option<String>,
    execute_if_no_rows_in_sheet: Option<String>,
    on_success: PostAction,
    on_failure: PostAction,
    stop_if_message_is_error: bool,
}

impl<A: Action> ConfiguredAction<A> {
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            execute_on_condition: None,
            execute_if_rows_in_sheet: None,
            execute_if_no_rows_in_sheet: None,
            on_success: PostAction::default(),
            on_failure: PostAction::default(),
            stop_if_message_is_error: false,
        }
    }

    #[must_use]
    pub fn execute_on_condition(mut self, field: impl Into<String>) -> Self {
        self.execute_on_condition = Some(field.into());
        self
    }

    #[must_use]
    pub fn execute_if_rows_in_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.execute_if_rows_in_sheet = Some(sheet.into());
        self
    }

    #[must_use]
    pub fn execute_if_no_rows_in_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.execute_if_no_rows_in_sheet = Some(sheet.into());
        self
    }

    #[must_use]
    pub fn on_success(mut self, post: PostAction) -> Self {
        self.on_success = post;
        self
    }

    #[must_use]
    pub fn on_failure(mut self, post: PostAction) -> Self {
        self.on_failure = post;
        self
    }

    #[must_use]
    pub const fn stop_if_message_is_error(mut self) -> Self {
        self.stop_if_message_is_error = true;
        self
    }

    #[must_use]
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    fn should_run(&self, ctx: &ServiceContext) -> bool {
        if let Some(field) = &self.execute_on_condition {
            let cleared = ctx.value(field).is_some_and(Value::interpret_as_boolean);
            if !cleared {
                log::debug!("condition {field} not met, skipping action {}", self.name());
                return false;
            }
        }
        if let Some(sheet) = &self.execute_if_no_rows_in_sheet
            && ctx.nbr_rows_in_sheet(sheet) > 0
        {
            return false;
        }
        if let Some(sheet) = &self.execute_if_rows_in_sheet
            && ctx.nbr_rows_in_sheet(sheet) == 0
        {
            return false;
        }

        true
    }

    fn post_process(&self, ctx: &mut ServiceContext, outcome: ActionOutcome) -> ActionOutcome {
        let succeeded = match &outcome {
            ActionOutcome::Continue => true,
            ActionOutcome::Recorded(value) => value.interpret_as_boolean(),
            ActionOutcome::Stop
            | ActionOutcome::Break
            | ActionOutcome::NextIteration
            | ActionOutcome::JumpTo(_) => return outcome,
        };
        let post = if succeeded {
            &self.on_success
        } else {
            &self.on_failure
        };

        if let Some(target) = &post.navigate_to {
            return ActionOutcome::jump(target.clone());
        }
        if let Some(message) = &post.message {
            ctx.add_message(message.kind, message.text.clone());
            if message.kind.is_error() && self.stop_if_message_is_error {
                return ActionOutcome::Stop;
            }
        }

        outcome
    }
}

impl<A: Action> Action for ConfiguredAction<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Navigation when either the wrapped action or post-processing can
    /// produce a jump.
    fn kind(&self) -> ActionKind {
        if self.inner.kind() == ActionKind::Navigation
            || self.on_success.navigate_to.is_some()
            || self.on_failure.navigate_to.is_some()
        {
            ActionKind::Navigation
        } else {
            ActionKind::Ordinary
        }
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        if !self.should_run(ctx) {
            return Ok(ActionOutcome::Continue);
        }

        let outcome = match self.inner.act(ctx)? {
            // The wrapper may present as navigation; keep the wrapped
            // action's plain text result a result.
            ActionOutcome::JumpTo(text) if self.inner.kind() == ActionKind::Ordinary => {
                ActionOutcome::Recorded(Value::text(text))
            }
            outcome => outcome,
        };

        if !self.on_success.is_set() && !self.on_failure.is_set() {
            return Ok(outcome);
        }

        Ok(self.post_process(ctx, outcome))
    }
}
