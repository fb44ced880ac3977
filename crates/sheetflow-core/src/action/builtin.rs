//! Module: action::builtin
//! Responsibility: the small actions every service assembles blocks from.
//! Does not own: persistence or transport; these only touch the context.
//! Boundary: each action is immutable and reusable across contexts.

use crate::{
    action::{Action, ActionBlock, ActionKind, ActionOutcome, BlockError, BlockOutcome},
    aggregate::GroupAggregation,
    context::{MessageKind, ServiceContext},
    error::InternalError,
    sheet::{DataSheet, Fields, FieldsMut},
    value::{Value, ValueType},
};
use std::{collections::BTreeMap, fmt};

// Shared `with_name` builder and `name()` plumbing for actions that carry
// an optional name.
macro_rules! named_action {
    ($($ty:ident),* $(,)?) => {
        $(
            impl $ty {
                #[must_use]
                pub fn with_name(mut self, name: impl Into<String>) -> Self {
                    self.name = name.into();
                    self
                }
            }
        )*
    };
}

named_action!(
    SetValue,
    RemoveValue,
    AddMessage,
    JumpTo,
    CreateSheet,
    AggregateSheet,
    NestedBlock,
    Loop,
    LogicAction,
);

///
/// SetValue
///

#[derive(Clone, Debug)]
pub struct SetValue {
    name: String,
    field: String,
    value: Value,
}

impl SetValue {
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: String::new(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Value typed by inspecting the text (see [`Value::infer`]).
    #[must_use]
    pub fn inferred(field: impl Into<String>, text: &str) -> Self {
        Self::new(field, Value::infer(text))
    }
}

impl Action for SetValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        ctx.set_value(self.field.clone(), self.value.clone());

        Ok(ActionOutcome::Continue)
    }
}

///
/// RemoveValue
///

#[derive(Clone, Debug)]
pub struct RemoveValue {
    name: String,
    field: String,
}

impl RemoveValue {
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            field: field.into(),
        }
    }
}

impl Action for RemoveValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        ctx.remove_value(&self.field);

        Ok(ActionOutcome::Continue)
    }
}

///
/// AddMessage
///

#[derive(Clone, Debug)]
pub struct AddMessage {
    name: String,
    kind: MessageKind,
    text: String,
}

impl AddMessage {
    #[must_use]
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            kind,
            text: text.into(),
        }
    }
}

impl Action for AddMessage {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        ctx.add_message(self.kind, self.text.clone());

        Ok(ActionOutcome::Continue)
    }
}

///
/// JumpTo
///
/// Unconditional jump. The targets `_stop`, `_break` and `_continue` signal
/// instead of jumping.
///

#[derive(Clone, Debug)]
pub struct JumpTo {
    name: String,
    target: String,
}

impl JumpTo {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            target: target.into(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Action for JumpTo {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Navigation
    }

    fn act(&self, _: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        Ok(ActionOutcome::jump(self.target.clone()))
    }
}

///
/// CreateSheet
///
/// Puts a copy of a template sheet into the context, replacing any sheet of
/// the same name.
///

#[derive(Clone, Debug)]
pub struct CreateSheet {
    name: String,
    sheet_name: String,
    template: DataSheet,
}

impl CreateSheet {
    #[must_use]
    pub fn new(sheet_name: impl Into<String>, template: DataSheet) -> Self {
        Self {
            name: String::new(),
            sheet_name: sheet_name.into(),
            template,
        }
    }
}

impl Action for CreateSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        ctx.put_sheet(self.sheet_name.clone(), self.template.clone());

        Ok(ActionOutcome::Continue)
    }
}

///
/// AggregateSheet
///
/// Summarizes a context sheet. With an output sheet the summary rows are put
/// there; without one the aggregate results become context fields. Records
/// the number of summary rows produced.
///

#[derive(Clone, Debug)]
pub struct AggregateSheet {
    name: String,
    input_sheet: String,
    output_sheet: Option<String>,
    aggregation: GroupAggregation,
}

impl AggregateSheet {
    #[must_use]
    pub fn new(input_sheet: impl Into<String>, aggregation: GroupAggregation) -> Self {
        Self {
            name: String::new(),
            input_sheet: input_sheet.into(),
            output_sheet: None,
            aggregation,
        }
    }

    #[must_use]
    pub fn into_sheet(mut self, output_sheet: impl Into<String>) -> Self {
        self.output_sheet = Some(output_sheet.into());
        self
    }
}

impl Action for AggregateSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        let input = ctx.sheet(&self.input_sheet).ok_or_else(|| {
            InternalError::context_not_found(format!(
                "sheet '{}' is not in context",
                self.input_sheet
            ))
        })?;

        let Some(output_sheet) = &self.output_sheet else {
            let mut fields = BTreeMap::new();
            self.aggregation.summarize_into(input, &mut fields)?;
            for (field, value) in fields {
                ctx.set_value(field, value);
            }
            return Ok(ActionOutcome::recorded(1i64));
        };

        let output = self.aggregation.run(input)?;
        let rows = i64::try_from(output.length()).unwrap_or(i64::MAX);
        ctx.put_sheet(output_sheet.clone(), output);

        Ok(ActionOutcome::recorded(rows))
    }
}

///
/// NestedBlock
///
/// Runs an inner block against the same context; a stopped inner block
/// stops the outer one. Loop signals pass through to the enclosing loop.
///

#[derive(Debug)]
pub struct NestedBlock {
    name: String,
    block: ActionBlock,
}

impl NestedBlock {
    #[must_use]
    pub const fn new(block: ActionBlock) -> Self {
        Self {
            name: String::new(),
            block,
        }
    }
}

impl Action for NestedBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        match self.block.act(ctx)? {
            BlockOutcome::Completed => Ok(ActionOutcome::Continue),
            BlockOutcome::Stopped => Ok(ActionOutcome::Stop),
            BlockOutcome::Break => Ok(ActionOutcome::Break),
            BlockOutcome::NextIteration => Ok(ActionOutcome::NextIteration),
        }
    }
}

///
/// Loop
///
/// Repeats an inner block, either once per row of a context sheet or while a
/// context field is truthy. Inside the block `_break` ends the loop and
/// `_continue` starts the next iteration; `_stop` stops the loop and the
/// enclosing block. Records the number of iterations run.
///

#[derive(Debug)]
pub struct Loop {
    name: String,
    source: LoopSource,
    block: ActionBlock,
    max_iterations: Option<u64>,
}

#[derive(Clone, Debug)]
enum LoopSource {
    Sheet {
        sheet_name: String,
        to_fields: Option<ColumnSelection>,
        to_columns: Option<ColumnSelection>,
    },
    Condition(String),
}

/// Columns named for copying; a lone `*` selects every column.
#[derive(Clone, Debug)]
enum ColumnSelection {
    All,
    Named(Vec<String>),
}

impl ColumnSelection {
    fn parse<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        match names.as_slice() {
            [] => None,
            [only] if only == "*" => Some(Self::All),
            _ => Some(Self::Named(names)),
        }
    }

    fn resolve(&self, sheet: &DataSheet) -> Vec<String> {
        match self {
            Self::All => sheet.column_names().map(str::to_string).collect(),
            Self::Named(names) => names.clone(),
        }
    }
}

enum Iteration {
    Next,
    Break,
    Stop,
}

impl Iteration {
    const fn from_block(outcome: BlockOutcome) -> Self {
        match outcome {
            BlockOutcome::Completed | BlockOutcome::NextIteration => Self::Next,
            BlockOutcome::Break => Self::Break,
            BlockOutcome::Stopped => Self::Stop,
        }
    }
}

impl Loop {
    /// Run `block` once per row of `sheet_name`.
    #[must_use]
    pub fn over_sheet(sheet_name: impl Into<String>, block: ActionBlock) -> Self {
        Self {
            name: String::new(),
            source: LoopSource::Sheet {
                sheet_name: sheet_name.into(),
                to_fields: None,
                to_columns: None,
            },
            block,
            max_iterations: None,
        }
    }

    /// Run `block` while the field `condition` is truthy. A missing field is
    /// false.
    #[must_use]
    pub fn while_true(condition: impl Into<String>, block: ActionBlock) -> Self {
        Self {
            name: String::new(),
            source: LoopSource::Condition(condition.into()),
            block,
            max_iterations: None,
        }
    }

    /// Before each row, copy these columns into same-named fields. The
    /// fields are restored once the loop ends. Ignored for condition loops.
    #[must_use]
    pub fn copy_columns_to_fields<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let LoopSource::Sheet { to_fields, .. } = &mut self.source {
            *to_fields = ColumnSelection::parse(columns);
        }
        self
    }

    /// After each row, copy these fields back into same-named columns. A
    /// missing field writes an unknown cell. Ignored for condition loops.
    #[must_use]
    pub fn copy_fields_to_columns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let LoopSource::Sheet { to_columns, .. } = &mut self.source {
            *to_columns = ColumnSelection::parse(fields);
        }
        self
    }

    /// Fail once this many iterations have run without the loop ending.
    #[must_use]
    pub const fn with_max_iterations(mut self, limit: u64) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    fn check_limit(&self, iterations: u64) -> Result<(), BlockError> {
        match self.max_iterations {
            Some(limit) if iterations >= limit => Err(BlockError::IterationLimitExceeded {
                name: self.name.clone(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn loop_on_condition(
        &self,
        ctx: &mut ServiceContext,
        condition: &str,
    ) -> Result<(u64, bool), InternalError> {
        let mut iterations = 0;

        while ctx.value(condition).is_some_and(Value::interpret_as_boolean) {
            self.check_limit(iterations)?;
            iterations += 1;

            match Iteration::from_block(self.block.act(ctx)?) {
                Iteration::Next => {}
                Iteration::Break => break,
                Iteration::Stop => return Ok((iterations, true)),
            }
        }

        Ok((iterations, false))
    }

    fn loop_on_sheet(
        &self,
        ctx: &mut ServiceContext,
        sheet_name: &str,
        to_fields: Option<&ColumnSelection>,
        to_columns: Option<&ColumnSelection>,
    ) -> Result<(u64, bool), InternalError> {
        let Some(sheet) = ctx.sheet(sheet_name) else {
            log::debug!("sheet {sheet_name} is not in context, loop has no work");
            return Ok((0, false));
        };
        if sheet.length() == 0 {
            log::debug!("sheet {sheet_name} has no rows, loop has no work");
            return Ok((0, false));
        }

        let field_names = to_fields.map(|s| s.resolve(sheet)).unwrap_or_default();
        let column_names = to_columns.map(|s| s.resolve(sheet)).unwrap_or_default();
        let saved: Vec<(String, Option<Value>)> = field_names
            .iter()
            .map(|name| (name.clone(), ctx.value(name).cloned()))
            .collect();

        let result = self.iterate_rows(ctx, sheet_name, &field_names, &column_names);

        for (name, value) in saved {
            match value {
                Some(value) => ctx.set_value(name, value),
                None => {
                    ctx.remove_value(&name);
                }
            }
        }

        result
    }

    fn iterate_rows(
        &self,
        ctx: &mut ServiceContext,
        sheet_name: &str,
        field_names: &[String],
        column_names: &[String],
    ) -> Result<(u64, bool), InternalError> {
        let mut iterations = 0;
        let mut index = 0;

        // The block may change the sheet; re-read the row each pass.
        while let Some(row) = ctx.sheet(sheet_name).and_then(|sheet| sheet.row_view(index)) {
            self.check_limit(iterations)?;
            iterations += 1;

            let copied = field_names
                .iter()
                .map(|name| {
                    row.field(name)
                        .cloned()
                        .map(|value| (name.clone(), value))
                        .ok_or_else(|| BlockError::UnknownLoopColumn {
                            column: name.clone(),
                            sheet: sheet_name.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            for (name, value) in copied {
                ctx.set_value(name, value);
            }

            let outcome = Iteration::from_block(self.block.act(ctx)?);

            let written: Vec<(&str, Option<Value>)> = column_names
                .iter()
                .map(|name| (name.as_str(), ctx.value(name).cloned()))
                .collect();
            if let Some(mut row) = ctx
                .sheet_mut(sheet_name)
                .and_then(|sheet| sheet.row_view_mut(index))
            {
                for (name, value) in written {
                    row.set_field(name, value.unwrap_or(Value::unknown(ValueType::Text)))?;
                }
            }

            match outcome {
                Iteration::Next => index += 1,
                Iteration::Break => break,
                Iteration::Stop => return Ok((iterations, true)),
            }
        }

        Ok((iterations, false))
    }
}

impl Action for Loop {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        let (iterations, stopped) = match &self.source {
            LoopSource::Sheet {
                sheet_name,
                to_fields,
                to_columns,
            } => self.loop_on_sheet(ctx, sheet_name, to_fields.as_ref(), to_columns.as_ref())?,
            LoopSource::Condition(condition) => self.loop_on_condition(ctx, condition)?,
        };
        log::debug!("loop {} ran {iterations} iterations", self.name);

        if stopped {
            return Ok(ActionOutcome::Stop);
        }

        Ok(ActionOutcome::recorded(i64::try_from(iterations).unwrap_or(i64::MAX)))
    }
}

///
/// LogicAction
///
/// Caller-supplied logic as a closure.
///

type Logic = dyn Fn(&mut ServiceContext) -> Result<ActionOutcome, InternalError>;

pub struct LogicAction {
    name: String,
    kind: ActionKind,
    logic: Box<Logic>,
}

impl LogicAction {
    #[must_use]
    pub fn new<F>(logic: F) -> Self
    where
        F: Fn(&mut ServiceContext) -> Result<ActionOutcome, InternalError> + 'static,
    {
        Self {
            name: String::new(),
            kind: ActionKind::Ordinary,
            logic: Box::new(logic),
        }
    }

    /// Treat jump outcomes of the closure as navigation.
    #[must_use]
    pub const fn navigation(mut self) -> Self {
        self.kind = ActionKind::Navigation;
        self
    }
}

impl Action for LogicAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn act(&self, ctx: &mut ServiceContext) -> Result<ActionOutcome, InternalError> {
        (self.logic)(ctx)
    }
}

impl fmt::Debug for LogicAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicAction")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
