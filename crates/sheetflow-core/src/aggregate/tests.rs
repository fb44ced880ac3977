use crate::{
    aggregate::{
        AggregateError, AggregationType, AggregationWorker, Aggregator, GroupAggregation, Phase,
    },
    sheet::{DataSheet, Fields},
    value::{Value, ValueType},
};
use proptest::prelude::*;
use std::collections::BTreeMap;

type Row = BTreeMap<String, Value>;

fn row(field: &str, value: Value) -> Row {
    let mut row = Row::new();
    row.insert(field.to_string(), value);
    row
}

fn run_cycle(worker: &mut AggregationWorker, rows: &[Row]) -> Row {
    let mut out = Row::new();
    worker.init().expect("init");
    for r in rows {
        worker.accumulate(r).expect("accumulate");
    }
    worker.write_out(&mut out).expect("write out");
    out
}

fn amounts(values: &[Value]) -> Vec<Row> {
    values.iter().cloned().map(|v| row("amount", v)).collect()
}

///
/// REDUCERS
///

#[test]
fn sum_and_average_skip_unknown_rows() {
    let rows = amounts(&[
        Value::integer(2),
        Value::unknown(ValueType::Integer),
        Value::decimal(3.5),
    ]);

    let mut sum = AggregationType::Sum.worker(Some("amount"), "total", true);
    assert_eq!(run_cycle(&mut sum, &rows).field("total"), Some(&Value::decimal(5.5)));

    let mut avg = AggregationType::Average.worker(Some("amount"), "avg", true);
    assert_eq!(run_cycle(&mut avg, &rows).field("avg"), Some(&Value::decimal(2.75)));

    let mut avg_int = AggregationType::Average.worker(Some("amount"), "avg", false);
    assert_eq!(run_cycle(&mut avg_int, &rows).field("avg"), Some(&Value::integer(3)));
}

#[test]
fn numeric_reducers_report_zero_without_rows() {
    for kind in [
        AggregationType::Sum,
        AggregationType::Average,
        AggregationType::Max,
        AggregationType::Min,
    ] {
        let mut worker = kind.worker(Some("amount"), "out", false);
        let out = run_cycle(&mut worker, &[]);
        assert_eq!(out.field("out"), Some(&Value::integer(0)), "{kind}");
    }
}

#[test]
fn max_and_min_let_the_first_real_value_win() {
    let negatives = amounts(&[Value::integer(-5), Value::integer(-9), Value::integer(-7)]);

    let mut max = AggregationType::Max.worker(Some("amount"), "max", false);
    assert_eq!(run_cycle(&mut max, &negatives).field("max"), Some(&Value::integer(-5)));

    let large = amounts(&[Value::integer(5), Value::integer(9)]);
    let mut min = AggregationType::Min.worker(Some("amount"), "min", false);
    assert_eq!(run_cycle(&mut min, &large).field("min"), Some(&Value::integer(5)));
}

#[test]
fn integer_output_rounds_half_up() {
    let rows = amounts(&[Value::decimal(1.25), Value::decimal(1.25)]);
    let mut sum = AggregationType::Sum.worker(Some("amount"), "total", false);
    assert_eq!(run_cycle(&mut sum, &rows).field("total"), Some(&Value::integer(3)));
}

#[test]
fn count_star_counts_every_row_and_named_count_skips_unknown() {
    let rows = amounts(&[
        Value::integer(1),
        Value::unknown(ValueType::Integer),
        Value::integer(3),
    ]);

    let mut all = AggregationType::Count.worker(Some("*"), "n", true);
    assert_eq!(run_cycle(&mut all, &rows).field("n"), Some(&Value::integer(3)));

    let mut none = AggregationType::Count.worker(None, "n", false);
    assert_eq!(run_cycle(&mut none, &rows).field("n"), Some(&Value::integer(3)));

    let mut named = AggregationType::Count.worker(Some("amount"), "n", false);
    assert_eq!(run_cycle(&mut named, &rows).field("n"), Some(&Value::integer(2)));
}

#[test]
fn first_and_last_capture_known_values() {
    let rows = amounts(&[
        Value::unknown(ValueType::Text),
        Value::text("a"),
        Value::text("b"),
        Value::unknown(ValueType::Text),
    ]);

    let mut first = AggregationType::First.worker(Some("amount"), "f", false);
    assert_eq!(run_cycle(&mut first, &rows).field("f"), Some(&Value::text("a")));

    let mut last = AggregationType::Last.worker(Some("amount"), "l", false);
    assert_eq!(run_cycle(&mut last, &rows).field("l"), Some(&Value::text("b")));
}

#[test]
fn empty_capture_overwrites_previous_output_with_unknown() {
    let mut out = row("f", Value::text("stale"));
    let mut first = AggregationType::First
        .worker(Some("amount"), "f", false)
        .with_input_type(ValueType::Date);
    first.init().expect("init");
    first
        .accumulate(&row("amount", Value::unknown(ValueType::Date)))
        .expect("accumulate");
    first.write_out(&mut out).expect("write out");
    assert_eq!(out.field("f"), Some(&Value::unknown(ValueType::Date)));

    let mut last = AggregationType::Last.worker(Some("amount"), "l", false);
    assert_eq!(
        run_cycle(&mut last, &[]).field("l"),
        Some(&Value::unknown(ValueType::Text))
    );
}

#[test]
fn non_finite_totals_write_unknown() {
    let rows = amounts(&[Value::decimal(f64::NAN), Value::integer(1)]);

    let mut sum = AggregationType::Sum.worker(Some("amount"), "total", false);
    assert_eq!(
        run_cycle(&mut sum, &rows).field("total"),
        Some(&Value::unknown(ValueType::Integer))
    );

    let mut avg = AggregationType::Average.worker(Some("amount"), "avg", true);
    assert_eq!(
        run_cycle(&mut avg, &rows).field("avg"),
        Some(&Value::unknown(ValueType::Decimal))
    );
}

#[test]
fn reducers_other_than_count_need_an_input() {
    for kind in AggregationType::ALL {
        let mut worker = kind.worker(None, "out", false);
        let started = worker.init();
        if kind == AggregationType::Count {
            assert!(started.is_ok());
        } else {
            assert_eq!(started, Err(AggregateError::MissingInput { kind }));
            assert_eq!(worker.phase(), Phase::Idle);
        }
    }

    let mut blank = AggregationType::Max.worker(Some(""), "out", false);
    assert_eq!(
        blank.init(),
        Err(AggregateError::MissingInput {
            kind: AggregationType::Max
        })
    );
}

#[test]
fn numeric_reducer_rejects_text() {
    let mut sum = AggregationType::Sum.worker(Some("amount"), "total", false);
    sum.init().expect("init");
    let err = sum
        .accumulate(&row("amount", Value::text("12")))
        .expect_err("text is not numeric");
    assert_eq!(
        err,
        AggregateError::IncompatibleType {
            kind: AggregationType::Sum,
            field: "amount".into(),
            value_type: ValueType::Text,
        }
    );
}

#[test]
fn write_out_to_missing_column_is_unknown_column() {
    let mut sheet = DataSheet::from_pairs([("other", ValueType::Integer)]).expect("valid");
    let mut count = AggregationType::Count.worker(None, "n", false);
    count.init().expect("init");

    let mut out = sheet.append_unknown_row();
    assert_eq!(
        count.write_out(&mut out),
        Err(AggregateError::UnknownColumn { name: "n".into() })
    );
}

///
/// LIFECYCLE
///

#[test]
fn lifecycle_violations_are_reuse_errors() {
    let mut worker = AggregationType::Sum.worker(Some("amount"), "total", false);
    let r = row("amount", Value::integer(1));

    assert!(matches!(
        worker.accumulate(&r),
        Err(AggregateError::ReuseViolation {
            operation: "accumulate",
            phase: Phase::Idle,
            ..
        })
    ));
    assert!(matches!(
        worker.write_out(&mut Row::new()),
        Err(AggregateError::ReuseViolation { .. })
    ));
    assert!(matches!(worker.discard(), Err(AggregateError::ReuseViolation { .. })));

    worker.init().expect("init");
    assert!(matches!(
        worker.init(),
        Err(AggregateError::ReuseViolation {
            operation: "init",
            phase: Phase::Accumulating,
            ..
        })
    ));
}

#[test]
fn write_out_ends_the_cycle_and_init_restarts_it() {
    let mut worker = AggregationType::Sum.worker(Some("amount"), "total", false);
    let first = run_cycle(&mut worker, &amounts(&[Value::integer(4)]));
    assert_eq!(worker.phase(), Phase::Finished);
    assert!(worker.accumulate(&row("amount", Value::integer(1))).is_err());

    // A fresh cycle starts from zero.
    let second = run_cycle(&mut worker, &amounts(&[Value::integer(1)]));
    assert_eq!(first.field("total"), Some(&Value::integer(4)));
    assert_eq!(second.field("total"), Some(&Value::integer(1)));
}

#[test]
fn discard_ends_the_cycle_for_count_too() {
    let mut count = AggregationType::Count.worker(None, "n", false);
    count.init().expect("init");
    count.accumulate(&Row::new()).expect("accumulate");
    count.discard().expect("discard");

    assert_eq!(count.phase(), Phase::Finished);
    assert!(matches!(
        count.accumulate(&Row::new()),
        Err(AggregateError::ReuseViolation {
            operation: "accumulate",
            phase: Phase::Finished,
            ..
        })
    ));

    // Accumulation does not survive the discard.
    let out = run_cycle(&mut count, &[Row::new()]);
    assert_eq!(out.field("n"), Some(&Value::integer(1)));
}

#[test]
fn reset_is_legal_from_any_phase() {
    let mut worker = AggregationType::Min.worker(Some("amount"), "min", false);
    worker.reset();
    assert_eq!(worker.phase(), Phase::Idle);

    worker.init().expect("init");
    worker
        .accumulate(&row("amount", Value::integer(-3)))
        .expect("accumulate");
    worker.reset();
    assert_eq!(worker.phase(), Phase::Idle);

    let out = run_cycle(&mut worker, &amounts(&[Value::integer(8)]));
    assert_eq!(out.field("min"), Some(&Value::integer(8)));
}

#[test]
fn dropped_cycle_discards() {
    let mut worker = AggregationType::Sum.worker(Some("amount"), "total", false);
    {
        let mut cycle = worker.begin().expect("begin");
        cycle
            .accumulate(&row("amount", Value::integer(10)))
            .expect("accumulate");
    }
    assert_eq!(worker.phase(), Phase::Finished);

    let mut out = Row::new();
    let mut cycle = worker.begin().expect("begin again");
    cycle
        .accumulate(&row("amount", Value::integer(2)))
        .expect("accumulate");
    cycle.write_out(&mut out).expect("write out");
    assert_eq!(out.field("total"), Some(&Value::integer(2)));
}

proptest! {
    #[test]
    fn sum_matches_plain_addition(values in prop::collection::vec(-1_000i64..1_000, 0..32)) {
        let rows: Vec<Row> = values.iter().map(|v| row("amount", Value::integer(*v))).collect();
        let mut sum = AggregationType::Sum.worker(Some("amount"), "total", false);
        let out = run_cycle(&mut sum, &rows);
        prop_assert_eq!(out.field("total"), Some(&Value::integer(values.iter().sum())));
    }

    #[test]
    fn count_star_equals_row_count(n in 0usize..64) {
        let rows = vec![Row::new(); n];
        let mut count = AggregationType::Count.worker(Some("*"), "n", false);
        let out = run_cycle(&mut count, &rows);
        prop_assert_eq!(out.field("n"), Some(&Value::integer(i64::try_from(n).unwrap())));
    }
}

///
/// GROUPING
///

fn sales() -> DataSheet {
    let mut sheet = DataSheet::from_pairs([
        ("region", ValueType::Text),
        ("amount", ValueType::Decimal),
        ("units", ValueType::Integer),
    ])
    .expect("valid");

    for (region, amount, units) in [
        ("east", 10.0, 1),
        ("east", 5.5, 2),
        ("north", 1.0, 3),
        ("west", 2.0, 4),
        ("west", 3.0, 5),
    ] {
        sheet
            .append_row(vec![
                Value::text(region),
                Value::decimal(amount),
                Value::integer(units),
            ])
            .expect("fits");
    }

    sheet
}

fn sales_summary() -> GroupAggregation {
    GroupAggregation::new(
        vec!["region".into()],
        vec![
            Aggregator::new(AggregationType::Sum, Some("amount"), "total").as_decimal(),
            Aggregator::new(AggregationType::Count, Some("*"), "rows"),
            Aggregator::new(AggregationType::Max, Some("units"), "maxUnits"),
        ],
    )
}

#[test]
fn group_aggregation_emits_one_row_per_group() {
    let out = sales_summary().run(&sales()).expect("aggregates");

    let names: Vec<_> = out.column_names().collect();
    assert_eq!(names, ["region", "total", "rows", "maxUnits"]);
    assert_eq!(out.length(), 3);

    assert_eq!(
        out.row(0).expect("east"),
        &[
            Value::text("east"),
            Value::decimal(15.5),
            Value::integer(2),
            Value::integer(2),
        ][..]
    );
    assert_eq!(out.row(2).map(|r| r[1].clone()), Some(Value::decimal(5.0)));
}

#[test]
fn group_aggregation_without_keys_always_emits_one_row() {
    let agg = GroupAggregation::new(
        vec![],
        vec![
            Aggregator::new(AggregationType::Sum, Some("units"), "units"),
            Aggregator::new(AggregationType::Count, None, "rows"),
        ],
    );

    let out = agg.run(&sales()).expect("aggregates");
    assert_eq!(out.row(0), Some(&[Value::integer(15), Value::integer(5)][..]));

    let empty = DataSheet::new(sales().columns().to_vec()).expect("valid");
    let out = agg.run(&empty).expect("aggregates");
    assert_eq!(out.row(0), Some(&[Value::integer(0), Value::integer(0)][..]));
}

#[test]
fn group_aggregation_rejects_unknown_input_column() {
    let agg = GroupAggregation::new(
        vec![],
        vec![Aggregator::new(AggregationType::Sum, Some("missing"), "x")],
    );
    let err = agg.run(&sales()).expect_err("missing column");
    assert_eq!(
        err.aggregate_error(),
        Some(&AggregateError::UnknownColumn {
            name: "missing".into()
        })
    );
}

#[test]
fn group_aggregation_rejects_aggregator_without_input() {
    let agg = GroupAggregation::new(
        vec![],
        vec![Aggregator::new(AggregationType::Sum, None, "total")],
    );

    let err = agg.run(&sales()).expect_err("sum needs an input");
    assert!(err.is_configuration_fault());
    assert_eq!(
        err.aggregate_error(),
        Some(&AggregateError::MissingInput {
            kind: AggregationType::Sum
        })
    );

    let mut target = Row::new();
    assert!(agg.summarize_into(&sales(), &mut target).is_err());
    assert!(target.is_empty());
}

#[test]
fn group_aggregation_first_over_empty_group_is_typed_unknown() {
    let agg = GroupAggregation::new(
        vec![],
        vec![Aggregator::new(AggregationType::First, Some("units"), "firstUnits")],
    );
    let empty = DataSheet::new(sales().columns().to_vec()).expect("valid");

    let mut target = row("firstUnits", Value::integer(99));
    agg.summarize_into(&empty, &mut target).expect("summarizes");
    assert_eq!(
        target.field("firstUnits"),
        Some(&Value::unknown(ValueType::Integer))
    );
}

#[test]
fn summarize_into_writes_fields() {
    let mut target = Row::new();
    sales_summary()
        .summarize_into(&sales(), &mut target)
        .expect("summarizes");

    assert_eq!(target.field("total"), Some(&Value::decimal(21.5)));
    assert_eq!(target.field("rows"), Some(&Value::integer(5)));
    assert_eq!(target.field("maxUnits"), Some(&Value::integer(5)));
}

#[test]
fn aggregator_round_trips_through_json() {
    let json = serde_json::json!({
        "aggregation": "average",
        "inputField": "amount",
        "outputField": "avg",
        "outputAsDecimal": true,
    });
    let agg: Aggregator = serde_json::from_value(json).expect("decodes");
    assert_eq!(agg.aggregation, AggregationType::Average);
    assert!(agg.worker().output_as_decimal());
}
