//! Metrics sink boundary.
//!
//! Engine logic MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::{aggregate::AggregationType, obs::metrics};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
    static METRICS_ENABLED: Cell<bool> = const { Cell::new(true) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    BlockStart,
    BlockFinish {
        steps: u64,
        completed: bool,
    },
    ActionFinish {
        elapsed_micros: u64,
    },
    Jump,
    ResultRecorded,
    RowAccumulated {
        kind: AggregationType,
        skipped: bool,
    },
    CycleFinish {
        kind: AggregationType,
        written: bool,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::BlockStart => metrics::with_state_mut(|m| {
                m.ops.block_calls = m.ops.block_calls.saturating_add(1);
            }),

            MetricsEvent::BlockFinish { steps, completed } => metrics::with_state_mut(|m| {
                if completed {
                    m.ops.blocks_completed = m.ops.blocks_completed.saturating_add(1);
                } else {
                    m.ops.blocks_stopped = m.ops.blocks_stopped.saturating_add(1);
                }
                if steps > m.perf.block_steps_max {
                    m.perf.block_steps_max = steps;
                }
            }),

            MetricsEvent::ActionFinish { elapsed_micros } => metrics::with_state_mut(|m| {
                m.ops.actions_run = m.ops.actions_run.saturating_add(1);
                metrics::add_micros(
                    &mut m.perf.action_micros_total,
                    &mut m.perf.action_micros_max,
                    elapsed_micros,
                );
            }),

            MetricsEvent::Jump => metrics::with_state_mut(|m| {
                m.ops.jumps = m.ops.jumps.saturating_add(1);
            }),

            MetricsEvent::ResultRecorded => metrics::with_state_mut(|m| {
                m.ops.results_recorded = m.ops.results_recorded.saturating_add(1);
            }),

            MetricsEvent::RowAccumulated { kind, skipped } => metrics::with_state_mut(|m| {
                let entry = m.aggregations.entry(kind.label().to_string()).or_default();
                if skipped {
                    m.ops.rows_skipped = m.ops.rows_skipped.saturating_add(1);
                    entry.rows_skipped = entry.rows_skipped.saturating_add(1);
                } else {
                    m.ops.rows_accumulated = m.ops.rows_accumulated.saturating_add(1);
                    entry.rows_accumulated = entry.rows_accumulated.saturating_add(1);
                }
            }),

            MetricsEvent::CycleFinish { kind, written } => metrics::with_state_mut(|m| {
                let entry = m.aggregations.entry(kind.label().to_string()).or_default();
                if written {
                    m.ops.aggregation_cycles = m.ops.aggregation_cycles.saturating_add(1);
                    entry.cycles = entry.cycles.saturating_add(1);
                } else {
                    m.ops.aggregation_discards = m.ops.aggregation_discards.saturating_add(1);
                    entry.discards = entry.discards.saturating_add(1);
                }
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    if !METRICS_ENABLED.with(Cell::get) {
        return;
    }

    // Clone out of the slot so a sink may itself record without re-borrowing.
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Turn event recording on or off for the current thread.
pub fn set_metrics_enabled(enabled: bool) {
    METRICS_ENABLED.with(|cell| cell.set(enabled));
}

/// Run a closure with a temporary metrics sink override.
/// The previous sink is restored on every exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Saturating microsecond count for an elapsed duration.
pub(crate) fn micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// BlockSpan
/// RAII guard that emits start/finish events for one block invocation.
/// Finish accounting happens even when an action fails and `?` unwinds the
/// block early; such runs count as stopped.

pub(crate) struct BlockSpan {
    steps: u64,
    completed: bool,
}

impl BlockSpan {
    #[must_use]
    pub(crate) fn new() -> Self {
        record(MetricsEvent::BlockStart);

        Self {
            steps: 0,
            completed: false,
        }
    }

    pub(crate) const fn step(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }

    pub(crate) const fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) const fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for BlockSpan {
    fn drop(&mut self) {
        record(MetricsEvent::BlockFinish {
            steps: self.steps,
            completed: self.completed,
        });
    }
}
