//! Module: action::block
//! Responsibility: run a fixed list of actions against one context,
//! following their outcomes.
//! Does not own: error policy; business messages are left to the caller.
//! Boundary: configuration faults (bad jump, duplicate name, step budget)
//! are hard errors.

use crate::{
    action::{
        Action, ActionKind, ActionOutcome, BREAK_SIGNAL, BlockError, CONTINUE_SIGNAL,
        GENERATED_NAME_PREFIX, RESULT_SUFFIX, STOP_SIGNAL,
    },
    config::BlockConfig,
    context::ServiceContext,
    error::InternalError,
    obs::sink::{self, BlockSpan, MetricsEvent},
    value::Value,
};
use std::{collections::HashMap, fmt, time::Instant};

///
/// BlockOutcome
///
/// `Break` and `NextIteration` report a loop signal that ended the block
/// early; outside a loop they end the block like `Stopped` does, without
/// stopping any enclosing block.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockOutcome {
    Completed,
    Stopped,
    Break,
    NextIteration,
}

impl BlockOutcome {
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

///
/// ActionBlock
///
/// Ordered actions plus a name index for jumps. Immutable once built, so one
/// block can serve any number of contexts.
///

pub struct ActionBlock {
    actions: Vec<Box<dyn Action>>,
    names: Vec<String>,
    positions: HashMap<String, usize>,
    max_steps: Option<u64>,
    trace_actions: bool,
}

impl ActionBlock {
    /// Build a block. Unnamed actions are named `_a<index>`.
    pub fn new(actions: Vec<Box<dyn Action>>) -> Result<Self, BlockError> {
        let mut names = Vec::with_capacity(actions.len());
        let mut positions = HashMap::with_capacity(actions.len());

        for (idx, action) in actions.iter().enumerate() {
            let name = match action.name() {
                "" => format!("{GENERATED_NAME_PREFIX}{idx}"),
                name => name.to_string(),
            };
            if positions.insert(name.clone(), idx).is_some() {
                return Err(BlockError::DuplicateActionName { name });
            }
            names.push(name);
        }

        Ok(Self {
            actions,
            names,
            positions,
            max_steps: None,
            trace_actions: false,
        })
    }

    /// Apply block execution settings.
    #[must_use]
    pub const fn with_config(mut self, config: &BlockConfig) -> Self {
        self.max_steps = config.max_steps;
        self.trace_actions = config.trace_actions;
        self
    }

    #[must_use]
    pub const fn with_max_steps(mut self, limit: u64) -> Self {
        self.max_steps = Some(limit);
        self
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Effective action names, in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Run the actions in order until the list ends or an action stops.
    pub fn act(&self, ctx: &mut ServiceContext) -> Result<BlockOutcome, InternalError> {
        let mut span = BlockSpan::new();
        let mut current = 0;

        while let Some(action) = self.actions.get(current) {
            if let Some(limit) = self.max_steps
                && span.steps() >= limit
            {
                return Err(BlockError::StepLimitExceeded { limit }.into());
            }
            span.step();

            let name = &self.names[current];
            let started = Instant::now();
            let outcome = action.act(ctx)?;
            let elapsed = started.elapsed();

            sink::record(MetricsEvent::ActionFinish {
                elapsed_micros: sink::micros(elapsed),
            });
            if self.trace_actions {
                log::trace!("action {name} finished with {outcome:?} in {elapsed:?}");
            }

            match outcome {
                ActionOutcome::Continue => current += 1,
                ActionOutcome::Stop => return Ok(BlockOutcome::Stopped),
                ActionOutcome::Break => return Ok(BlockOutcome::Break),
                ActionOutcome::NextIteration => return Ok(BlockOutcome::NextIteration),
                ActionOutcome::JumpTo(target) if action.kind() == ActionKind::Navigation => {
                    match target.as_str() {
                        STOP_SIGNAL => return Ok(BlockOutcome::Stopped),
                        BREAK_SIGNAL => return Ok(BlockOutcome::Break),
                        CONTINUE_SIGNAL => return Ok(BlockOutcome::NextIteration),
                        _ => {}
                    }
                    current = self.position(&target).ok_or_else(|| {
                        BlockError::UnknownJumpTarget {
                            target,
                            from: name.clone(),
                        }
                    })?;
                    sink::record(MetricsEvent::Jump);
                }
                ActionOutcome::JumpTo(target) => {
                    record_result(ctx, name, Value::text(target));
                    current += 1;
                }
                ActionOutcome::Recorded(value) => {
                    record_result(ctx, name, value);
                    current += 1;
                }
            }
        }

        span.complete();

        Ok(BlockOutcome::Completed)
    }
}

impl fmt::Debug for ActionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBlock")
            .field("names", &self.names)
            .field("max_steps", &self.max_steps)
            .field("trace_actions", &self.trace_actions)
            .finish_non_exhaustive()
    }
}

fn record_result(ctx: &mut ServiceContext, name: &str, value: Value) {
    ctx.set_value(format!("{name}{RESULT_SUFFIX}"), value);
    sink::record(MetricsEvent::ResultRecorded);
}
