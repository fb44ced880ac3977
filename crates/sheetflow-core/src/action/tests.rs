use crate::{
    action::{
        Action, ActionBlock, ActionKind, ActionOutcome, AddMessage, AggregateSheet, BlockError,
        BlockOutcome, ConfiguredAction, CreateSheet, JumpTo, LogicAction, Loop, NestedBlock,
        PostAction, RemoveValue, SetValue,
    },
    aggregate::{AggregationType, Aggregator, GroupAggregation},
    config::EngineConfig,
    context::{Message, MessageKind, ServiceContext},
    error::{ErrorClass, ErrorOrigin},
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    sheet::DataSheet,
    value::{Value, ValueType},
};
use std::{cell::RefCell, rc::Rc};

fn block(actions: Vec<Box<dyn Action>>) -> ActionBlock {
    ActionBlock::new(actions).expect("valid block")
}

fn ctx() -> ServiceContext {
    ServiceContext::anonymous("test.service")
}

fn counter_value(ctx: &ServiceContext, field: &str) -> i64 {
    ctx.value(field)
        .and_then(|v| v.to_integer().ok())
        .unwrap_or_default()
}

/// Increments `field` every time it runs.
fn increment(field: &'static str) -> LogicAction {
    LogicAction::new(move |ctx| {
        let next = counter_value(ctx, field) + 1;
        ctx.set_value(field, Value::integer(next));
        Ok(ActionOutcome::Continue)
    })
}

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

///
/// OUTCOMES
///

#[test]
fn from_signal_maps_the_legacy_convention() {
    assert_eq!(
        ActionOutcome::from_signal(None, ActionKind::Navigation),
        ActionOutcome::Continue
    );
    assert_eq!(
        ActionOutcome::from_signal(Some(Value::text("_stop")), ActionKind::Ordinary),
        ActionOutcome::Stop
    );
    assert_eq!(
        ActionOutcome::from_signal(Some(Value::text("next")), ActionKind::Navigation),
        ActionOutcome::JumpTo("next".into())
    );
    assert_eq!(
        ActionOutcome::from_signal(Some(Value::integer(7)), ActionKind::Ordinary),
        ActionOutcome::Recorded(Value::integer(7))
    );
}

///
/// BLOCK
///

#[test]
fn results_are_recorded_under_effective_names() {
    let b = block(vec![
        Box::new(LogicAction::new(|_| Ok(ActionOutcome::recorded(1i64))).with_name("first")),
        Box::new(LogicAction::new(|_| Ok(ActionOutcome::recorded("two")))),
        Box::new(SetValue::new("plain", 3i64)),
    ]);
    assert_eq!(b.names(), ["first", "_a1", "_a2"]);

    let mut ctx = ctx();
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Completed);

    assert_eq!(ctx.value("firstResult"), Some(&Value::integer(1)));
    assert_eq!(ctx.value("_a1Result"), Some(&Value::text("two")));
    assert_eq!(ctx.value("plain"), Some(&Value::integer(3)));
    assert!(ctx.value("_a2Result").is_none());
}

#[test]
fn empty_block_completes() {
    let b = block(vec![]);
    assert!(b.is_empty());
    assert_eq!(b.act(&mut ctx()).expect("runs"), BlockOutcome::Completed);
}

#[test]
fn stop_ends_the_block_early() {
    let b = block(vec![
        Box::new(SetValue::new("a", 1i64)),
        Box::new(LogicAction::new(|_| Ok(ActionOutcome::Stop))),
        Box::new(SetValue::new("b", 2i64)),
    ]);

    let mut ctx = ctx();
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Stopped);
    assert!(ctx.has_value("a"));
    assert!(!ctx.has_value("b"));
}

#[test]
fn jump_to_stop_token_stops() {
    let b = block(vec![Box::new(JumpTo::new("_stop")), Box::new(SetValue::new("b", 2i64))]);

    let mut ctx = ctx();
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Stopped);
    assert!(!ctx.has_value("b"));
}

#[test]
fn forward_jump_skips_actions() {
    let b = block(vec![
        Box::new(JumpTo::new("last")),
        Box::new(SetValue::new("skipped", true)),
        Box::new(SetValue::new("reached", true).with_name("last")),
    ]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert!(!ctx.has_value("skipped"));
    assert!(ctx.has_value("reached"));
}

#[test]
fn backward_jump_loops_until_navigation_continues() {
    let b = block(vec![
        Box::new(increment("count").with_name("inc")),
        Box::new(
            LogicAction::new(|ctx| {
                if counter_value(ctx, "count") < 3 {
                    Ok(ActionOutcome::JumpTo("inc".into()))
                } else {
                    Ok(ActionOutcome::Continue)
                }
            })
            .navigation(),
        ),
    ]);

    let mut ctx = ctx();
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Completed);
    assert_eq!(counter_value(&ctx, "count"), 3);
}

#[test]
fn ordinary_jump_outcome_is_recorded_not_followed() {
    let b = block(vec![
        Box::new(LogicAction::new(|_| Ok(ActionOutcome::JumpTo("nowhere".into()))).with_name("x")),
        Box::new(SetValue::new("after", true)),
    ]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert_eq!(ctx.value("xResult"), Some(&Value::text("nowhere")));
    assert!(ctx.has_value("after"));
}

#[test]
fn unknown_jump_target_is_fatal() {
    let b = block(vec![Box::new(JumpTo::new("missing").with_name("go"))]);

    let err = b.act(&mut ctx()).expect_err("bad target");
    assert!(err.is_configuration_fault());
    assert_eq!(err.class, ErrorClass::Configuration);
    assert_eq!(err.origin, ErrorOrigin::Block);
    assert_eq!(
        err.block_error(),
        Some(&BlockError::UnknownJumpTarget {
            target: "missing".into(),
            from: "go".into(),
        })
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let err = ActionBlock::new(vec![
        Box::new(SetValue::new("a", 1i64).with_name("same")),
        Box::new(SetValue::new("b", 1i64).with_name("same")),
    ])
    .expect_err("duplicate");
    assert_eq!(err, BlockError::DuplicateActionName { name: "same".into() });

    // Generated names take part in the check.
    let err = ActionBlock::new(vec![
        Box::new(SetValue::new("a", 1i64).with_name("_a1")),
        Box::new(SetValue::new("b", 1i64)),
    ])
    .expect_err("generated duplicate");
    assert_eq!(err, BlockError::DuplicateActionName { name: "_a1".into() });
}

#[test]
fn step_budget_stops_endless_loops() {
    let config = EngineConfig::from_toml_str("[block]\nmax_steps = 10").expect("valid");
    let b = block(vec![Box::new(JumpTo::new("spin").with_name("spin"))]).with_config(&config.block);

    let err = b.act(&mut ctx()).expect_err("loops forever");
    assert_eq!(
        err.block_error(),
        Some(&BlockError::StepLimitExceeded { limit: 10 })
    );
}

#[test]
fn step_budget_allows_exactly_the_limit() {
    let b = block(vec![
        Box::new(SetValue::new("a", 1i64)),
        Box::new(SetValue::new("b", 2i64)),
    ])
    .with_max_steps(2);

    assert_eq!(b.act(&mut ctx()).expect("fits"), BlockOutcome::Completed);
}

#[test]
fn block_ignores_error_messages() {
    let b = block(vec![
        Box::new(AddMessage::new(MessageKind::Error, "bad input")),
        Box::new(SetValue::new("after", true)),
    ]);

    let mut ctx = ctx();
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Completed);
    assert!(ctx.has_errors());
    assert!(ctx.has_value("after"));
}

#[test]
fn action_errors_propagate() {
    let b = block(vec![
        Box::new(LogicAction::new(|_| Err(crate::error::InternalError::action_internal("boom")))),
        Box::new(SetValue::new("after", true)),
    ]);

    let mut ctx = ctx();
    let err = b.act(&mut ctx).expect_err("fails");
    assert_eq!(err.origin, ErrorOrigin::Action);
    assert!(!ctx.has_value("after"));
}

#[test]
fn block_reports_metrics_events() {
    let sink = Rc::new(RecordingSink::default());
    let b = block(vec![
        Box::new(JumpTo::new("rec")),
        Box::new(SetValue::new("skipped", true)),
        Box::new(LogicAction::new(|_| Ok(ActionOutcome::recorded(true))).with_name("rec")),
    ]);

    with_metrics_sink(sink.clone(), || b.act(&mut ctx()).expect("runs"));

    let events = sink.events.borrow();
    assert!(matches!(events.first(), Some(MetricsEvent::BlockStart)));
    assert!(matches!(
        events.last(),
        Some(MetricsEvent::BlockFinish {
            steps: 2,
            completed: true
        })
    ));
    let count = |pred: fn(&MetricsEvent) -> bool| events.iter().filter(|e| pred(e)).count();
    assert_eq!(count(|e| matches!(e, MetricsEvent::ActionFinish { .. })), 2);
    assert_eq!(count(|e| matches!(e, MetricsEvent::Jump)), 1);
    assert_eq!(count(|e| matches!(e, MetricsEvent::ResultRecorded)), 1);
}

///
/// CONFIGURED
///

#[test]
fn condition_field_gates_execution() {
    let gated = ConfiguredAction::new(SetValue::new("ran", true)).execute_on_condition("go");
    let b = block(vec![Box::new(gated)]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert!(!ctx.has_value("ran"));

    ctx.set_value("go", Value::text("yes"));
    b.act(&mut ctx).expect("runs");
    assert!(ctx.has_value("ran"));
}

#[test]
fn sheet_row_conditions_gate_execution() {
    let b = block(vec![
        Box::new(
            ConfiguredAction::new(SetValue::new("has_rows", true))
                .execute_if_rows_in_sheet("orders"),
        ),
        Box::new(
            ConfiguredAction::new(SetValue::new("no_rows", true))
                .execute_if_no_rows_in_sheet("orders"),
        ),
    ]);

    let mut empty = ctx();
    b.act(&mut empty).expect("runs");
    assert!(!empty.has_value("has_rows"));
    assert!(empty.has_value("no_rows"));

    let mut sheet = DataSheet::from_pairs([("id", ValueType::Integer)]).expect("valid");
    sheet.append_row(vec![Value::integer(1)]).expect("fits");
    let mut full = ctx();
    full.put_sheet("orders", sheet);
    b.act(&mut full).expect("runs");
    assert!(full.has_value("has_rows"));
    assert!(!full.has_value("no_rows"));
}

#[test]
fn success_navigation_jumps() {
    let check = ConfiguredAction::new(
        LogicAction::new(|_| Ok(ActionOutcome::recorded(true))).with_name("check"),
    )
    .on_success(PostAction::navigate("done"));

    let b = block(vec![
        Box::new(check),
        Box::new(SetValue::new("skipped", true)),
        Box::new(SetValue::new("finished", true).with_name("done")),
    ]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert!(!ctx.has_value("skipped"));
    assert!(ctx.has_value("finished"));
    assert!(!ctx.has_value("checkResult"));
}

#[test]
fn failure_message_can_stop_the_block() {
    let validate = || {
        ConfiguredAction::new(
            LogicAction::new(|_| Ok(ActionOutcome::recorded(false))).with_name("validate"),
        )
        .on_failure(PostAction::message(Message::new(
            MessageKind::Error,
            "validation failed",
        )))
    };

    let stopping = block(vec![
        Box::new(validate().stop_if_message_is_error()),
        Box::new(SetValue::new("after", true)),
    ]);
    let mut ctx1 = ctx();
    assert_eq!(stopping.act(&mut ctx1).expect("runs"), BlockOutcome::Stopped);
    assert_eq!(ctx1.error_count(), 1);
    assert!(!ctx1.has_value("after"));

    let continuing = block(vec![
        Box::new(validate()),
        Box::new(SetValue::new("after", true)),
    ]);
    let mut ctx2 = ctx();
    assert_eq!(continuing.act(&mut ctx2).expect("runs"), BlockOutcome::Completed);
    assert_eq!(ctx2.value("validateResult"), Some(&Value::boolean(false)));
    assert!(ctx2.has_value("after"));
}

#[test]
fn success_message_added_for_continue() {
    let b = block(vec![Box::new(
        ConfiguredAction::new(RemoveValue::new("tmp")).on_success(PostAction::message(
            Message::new(MessageKind::Success, "cleaned"),
        )),
    )]);

    let mut ctx = ctx();
    ctx.set_value("tmp", Value::integer(1));
    b.act(&mut ctx).expect("runs");
    assert!(!ctx.has_value("tmp"));
    assert_eq!(ctx.messages(), [Message::new(MessageKind::Success, "cleaned")]);
}

#[test]
fn configured_action_keeps_wrapped_name_and_kind() {
    let plain = ConfiguredAction::new(SetValue::new("a", 1i64).with_name("set"));
    assert_eq!(plain.name(), "set");
    assert_eq!(plain.kind(), ActionKind::Ordinary);

    let nav = ConfiguredAction::new(SetValue::new("a", 1i64)).on_failure(PostAction::navigate("x"));
    assert_eq!(nav.kind(), ActionKind::Navigation);
}

///
/// BUILT-INS
///

fn orders() -> DataSheet {
    let mut sheet = DataSheet::from_pairs([
        ("customer", ValueType::Text),
        ("amount", ValueType::Decimal),
    ])
    .expect("valid");
    for (customer, amount) in [("ann", 10.0), ("ann", 2.5), ("bob", 4.0)] {
        sheet
            .append_row(vec![Value::text(customer), Value::decimal(amount)])
            .expect("fits");
    }
    sheet
}

#[test]
fn aggregate_sheet_writes_summary_sheet() {
    let aggregation = GroupAggregation::new(
        vec!["customer".into()],
        vec![Aggregator::new(AggregationType::Sum, Some("amount"), "total").as_decimal()],
    );
    let b = block(vec![Box::new(
        AggregateSheet::new("orders", aggregation)
            .into_sheet("totals")
            .with_name("agg"),
    )]);

    let mut ctx = ctx();
    ctx.put_sheet("orders", orders());
    b.act(&mut ctx).expect("runs");

    let totals = ctx.sheet("totals").expect("summary sheet");
    assert_eq!(totals.length(), 2);
    assert_eq!(
        totals.row(0),
        Some(&[Value::text("ann"), Value::decimal(12.5)][..])
    );
    assert_eq!(ctx.value("aggResult"), Some(&Value::integer(2)));
}

#[test]
fn aggregate_sheet_without_output_sets_fields() {
    let aggregation = GroupAggregation::new(
        vec![],
        vec![
            Aggregator::new(AggregationType::Count, Some("*"), "orderCount"),
            Aggregator::new(AggregationType::Max, Some("amount"), "largest"),
        ],
    );
    let b = block(vec![Box::new(AggregateSheet::new("orders", aggregation))]);

    let mut ctx = ctx();
    ctx.put_sheet("orders", orders());
    b.act(&mut ctx).expect("runs");

    assert_eq!(ctx.value("orderCount"), Some(&Value::integer(3)));
    assert_eq!(ctx.value("largest"), Some(&Value::integer(10)));
}

#[test]
fn aggregate_sheet_first_over_empty_sheet_clears_stale_field() {
    let aggregation = GroupAggregation::new(
        vec![],
        vec![Aggregator::new(AggregationType::First, Some("customer"), "firstCustomer")],
    );
    let b = block(vec![Box::new(AggregateSheet::new("orders", aggregation))]);

    let mut ctx = ctx();
    ctx.set_value("firstCustomer", Value::text("stale"));
    let empty = DataSheet::from_pairs([("customer", ValueType::Text)]).expect("valid");
    ctx.put_sheet("orders", empty);
    b.act(&mut ctx).expect("runs");

    assert_eq!(
        ctx.value("firstCustomer"),
        Some(&Value::unknown(ValueType::Text))
    );
}

#[test]
fn aggregate_sheet_requires_its_input() {
    let b = block(vec![Box::new(AggregateSheet::new(
        "missing",
        GroupAggregation::default(),
    ))]);

    let err = b.act(&mut ctx()).expect_err("no sheet");
    assert_eq!(err.class, ErrorClass::NotFound);
    assert_eq!(err.origin, ErrorOrigin::Context);
}

#[test]
fn create_sheet_replaces_existing() {
    let template = DataSheet::from_pairs([("id", ValueType::Integer)]).expect("valid");
    let b = block(vec![Box::new(CreateSheet::new("orders", template))]);

    let mut ctx = ctx();
    ctx.put_sheet("orders", orders());
    b.act(&mut ctx).expect("runs");

    assert_eq!(ctx.nbr_rows_in_sheet("orders"), 0);
    assert_eq!(ctx.sheet("orders").map(DataSheet::width), Some(1));
}

#[test]
fn inferred_set_value_types_text() {
    let b = block(vec![
        Box::new(SetValue::inferred("n", "42")),
        Box::new(SetValue::inferred("d", "2.5")),
        Box::new(SetValue::inferred("s", "hello")),
    ]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert_eq!(ctx.value("n"), Some(&Value::integer(42)));
    assert_eq!(ctx.value("d"), Some(&Value::decimal(2.5)));
    assert_eq!(ctx.value("s"), Some(&Value::text("hello")));
}

#[test]
fn nested_block_stop_stops_outer() {
    let inner = block(vec![
        Box::new(SetValue::new("inner", true)),
        Box::new(LogicAction::new(|_| Ok(ActionOutcome::Stop))),
    ]);
    let outer = block(vec![
        Box::new(NestedBlock::new(inner)),
        Box::new(SetValue::new("outer", true)),
    ]);

    let mut ctx = ctx();
    assert_eq!(outer.act(&mut ctx).expect("runs"), BlockOutcome::Stopped);
    assert!(ctx.has_value("inner"));
    assert!(!ctx.has_value("outer"));
}

#[test]
fn nested_block_completion_continues_outer() {
    let inner = block(vec![Box::new(SetValue::new("inner", true))]);
    let outer = block(vec![
        Box::new(NestedBlock::new(inner)),
        Box::new(SetValue::new("outer", true)),
    ]);

    let mut ctx = ctx();
    assert_eq!(outer.act(&mut ctx).expect("runs"), BlockOutcome::Completed);
    assert!(ctx.has_value("outer"));
}

///
/// LOOPS
///

fn items() -> DataSheet {
    let mut sheet =
        DataSheet::from_pairs([("item", ValueType::Text), ("qty", ValueType::Integer)])
            .expect("valid");
    for (item, qty) in [("a", 1), ("b", 2), ("c", 3)] {
        sheet
            .append_row(vec![Value::text(item), Value::integer(qty)])
            .expect("fits");
    }
    sheet
}

fn qty_column(ctx: &ServiceContext) -> Vec<Value> {
    ctx.sheet("items")
        .expect("items sheet")
        .column_values("qty")
        .expect("qty column")
        .cloned()
        .collect()
}

/// Doubles the `qty` field.
fn double_qty() -> LogicAction {
    LogicAction::new(|ctx| {
        let doubled = counter_value(ctx, "qty") * 2;
        ctx.set_value("qty", Value::integer(doubled));
        Ok(ActionOutcome::Continue)
    })
}

#[test]
fn sheet_loop_runs_block_per_row_and_writes_back() {
    let each = Loop::over_sheet("items", block(vec![Box::new(double_qty())]))
        .copy_columns_to_fields(["*"])
        .copy_fields_to_columns(["qty"])
        .with_name("each");
    let b = block(vec![Box::new(each)]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    ctx.set_value("qty", Value::integer(100));
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Completed);

    assert_eq!(
        qty_column(&ctx),
        vec![Value::integer(2), Value::integer(4), Value::integer(6)]
    );
    assert_eq!(ctx.value("eachResult"), Some(&Value::integer(3)));
}

#[test]
fn sheet_loop_restores_copied_fields() {
    let each = Loop::over_sheet("items", block(vec![Box::new(increment("rows"))]))
        .copy_columns_to_fields(["item", "qty"]);
    let b = block(vec![Box::new(each)]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    ctx.set_value("qty", Value::integer(100));
    b.act(&mut ctx).expect("runs");

    assert_eq!(counter_value(&ctx, "rows"), 3);
    assert_eq!(ctx.value("qty"), Some(&Value::integer(100)));
    assert!(!ctx.has_value("item"));
    assert_eq!(qty_column(&ctx)[0], Value::integer(1));
}

#[test]
fn sheet_loop_break_ends_after_current_row() {
    let stop_at_two = LogicAction::new(|ctx| {
        if counter_value(ctx, "qty") == 2 {
            Ok(ActionOutcome::JumpTo("_break".into()))
        } else {
            Ok(ActionOutcome::Continue)
        }
    })
    .navigation();
    let inner = block(vec![
        Box::new(double_qty()),
        Box::new(increment("seen")),
        Box::new(stop_at_two),
    ]);
    let each = Loop::over_sheet("items", inner)
        .copy_columns_to_fields(["*"])
        .copy_fields_to_columns(["*"])
        .with_name("each");
    let b = block(vec![Box::new(each), Box::new(SetValue::new("after", true))]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Completed);

    assert_eq!(counter_value(&ctx, "seen"), 1);
    assert_eq!(ctx.value("eachResult"), Some(&Value::integer(1)));
    assert_eq!(
        qty_column(&ctx),
        vec![Value::integer(2), Value::integer(2), Value::integer(3)]
    );
    assert!(ctx.has_value("after"));
}

#[test]
fn sheet_loop_continue_skips_rest_of_row() {
    let skip_odd = LogicAction::new(|ctx| {
        if counter_value(ctx, "qty") % 2 == 1 {
            Ok(ActionOutcome::NextIteration)
        } else {
            Ok(ActionOutcome::Continue)
        }
    });
    let inner = block(vec![Box::new(skip_odd), Box::new(increment("evens"))]);
    let each = Loop::over_sheet("items", inner)
        .copy_columns_to_fields(["qty"])
        .with_name("each");
    let b = block(vec![Box::new(each)]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    b.act(&mut ctx).expect("runs");

    assert_eq!(counter_value(&ctx, "evens"), 1);
    assert_eq!(ctx.value("eachResult"), Some(&Value::integer(3)));
}

#[test]
fn sheet_loop_stop_stops_enclosing_block_and_restores_fields() {
    let inner = block(vec![Box::new(JumpTo::new("_stop"))]);
    let each = Loop::over_sheet("items", inner).copy_columns_to_fields(["*"]);
    let b = block(vec![Box::new(each), Box::new(SetValue::new("after", true))]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    ctx.set_value("item", Value::text("kept"));
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Stopped);

    assert!(!ctx.has_value("after"));
    assert_eq!(ctx.value("item"), Some(&Value::text("kept")));
    assert!(!ctx.has_value("qty"));
}

#[test]
fn nested_block_passes_break_to_enclosing_loop() {
    let nested = NestedBlock::new(block(vec![Box::new(JumpTo::new("_break"))]));
    let inner = block(vec![Box::new(increment("seen")), Box::new(nested)]);
    let b = block(vec![Box::new(Loop::over_sheet("items", inner))]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::Completed);
    assert_eq!(counter_value(&ctx, "seen"), 1);
}

#[test]
fn sheet_loop_without_rows_has_no_work() {
    let each = Loop::over_sheet("missing", block(vec![Box::new(increment("seen"))]))
        .with_name("each");
    let b = block(vec![Box::new(each)]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert!(!ctx.has_value("seen"));
    assert_eq!(ctx.value("eachResult"), Some(&Value::integer(0)));
}

#[test]
fn sheet_loop_rejects_unknown_copy_column() {
    let each = Loop::over_sheet("items", block(vec![Box::new(increment("seen"))]))
        .copy_columns_to_fields(["price"]);
    let b = block(vec![Box::new(each)]);

    let mut ctx = ctx();
    ctx.put_sheet("items", items());
    let err = b.act(&mut ctx).expect_err("no such column");
    assert!(err.is_configuration_fault());
    assert_eq!(
        err.block_error(),
        Some(&BlockError::UnknownLoopColumn {
            column: "price".into(),
            sheet: "items".into(),
        })
    );
    assert!(!ctx.has_value("seen"));
}

#[test]
fn condition_loop_runs_while_field_is_truthy() {
    let until_three = LogicAction::new(|ctx| {
        let more = counter_value(ctx, "n") < 3;
        ctx.set_value("more", Value::boolean(more));
        Ok(ActionOutcome::Continue)
    });
    let inner = block(vec![Box::new(increment("n")), Box::new(until_three)]);
    let b = block(vec![Box::new(Loop::while_true("more", inner).with_name("repeat"))]);

    let mut ctx = ctx();
    ctx.set_value("more", Value::boolean(true));
    b.act(&mut ctx).expect("runs");

    assert_eq!(counter_value(&ctx, "n"), 3);
    assert_eq!(ctx.value("repeatResult"), Some(&Value::integer(3)));
}

#[test]
fn condition_loop_with_missing_field_never_runs() {
    let b = block(vec![Box::new(Loop::while_true(
        "more",
        block(vec![Box::new(increment("n"))]),
    ))]);

    let mut ctx = ctx();
    b.act(&mut ctx).expect("runs");
    assert!(!ctx.has_value("n"));
}

#[test]
fn condition_loop_iteration_budget_is_fatal() {
    let spin = Loop::while_true("more", block(vec![Box::new(increment("n"))]))
        .with_max_iterations(5)
        .with_name("spin");
    let b = block(vec![Box::new(spin)]);

    let mut ctx = ctx();
    ctx.set_value("more", Value::boolean(true));
    let err = b.act(&mut ctx).expect_err("never ends");

    assert!(err.is_configuration_fault());
    assert_eq!(
        err.block_error(),
        Some(&BlockError::IterationLimitExceeded {
            name: "spin".into(),
            limit: 5,
        })
    );
    assert_eq!(counter_value(&ctx, "n"), 5);
}

#[test]
fn loop_signals_outside_a_loop_end_the_block() {
    let b = block(vec![
        Box::new(JumpTo::new("_continue")),
        Box::new(SetValue::new("after", true)),
    ]);

    let mut ctx = ctx();
    assert_eq!(b.act(&mut ctx).expect("runs"), BlockOutcome::NextIteration);
    assert!(!ctx.has_value("after"));

    assert_eq!(
        ActionOutcome::from_signal(Some(Value::text("_break")), ActionKind::Navigation),
        ActionOutcome::Break
    );
    assert_eq!(
        ActionOutcome::from_signal(Some(Value::text("_break")), ActionKind::Ordinary),
        ActionOutcome::Recorded(Value::text("_break"))
    );
}
