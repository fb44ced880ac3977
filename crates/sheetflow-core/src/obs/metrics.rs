use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, thread-local counters for block execution and aggregation.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub aggregations: BTreeMap<String, AggregationCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            aggregations: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Blocks
    pub block_calls: u64,
    pub blocks_completed: u64,
    pub blocks_stopped: u64,

    // Actions
    pub actions_run: u64,
    pub jumps: u64,
    pub results_recorded: u64,

    // Aggregation
    pub aggregation_cycles: u64,
    pub aggregation_discards: u64,
    pub rows_accumulated: u64,
    pub rows_skipped: u64,
}

///
/// AggregationCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AggregationCounters {
    pub cycles: u64,
    pub discards: u64,
    pub rows_accumulated: u64,
    pub rows_skipped: u64,
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventPerf {
    pub action_micros_total: u128,
    pub action_micros_max: u64,
    pub block_steps_max: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration sample and track its max.
pub(crate) fn add_micros(total: &mut u128, max: &mut u64, delta: u64) {
    *total = total.saturating_add(u128::from(delta));
    if delta > *max {
        *max = delta;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-reducer summaries, busiest first.
    pub aggregation_counters: Vec<AggregationSummary>,
}

///
/// AggregationSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AggregationSummary {
    pub kind: String,
    pub cycles: u64,
    pub rows_accumulated: u64,
    pub rows_skipped: u64,
    pub avg_rows_per_cycle: f64,
}

/// Build a report, or an empty one when the current window started before
/// `window_start_ms`.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|since| since > snap.window_start_ms) {
        return EventReport::default();
    }

    let mut aggregation_counters: Vec<AggregationSummary> = snap
        .aggregations
        .iter()
        .map(|(kind, c)| AggregationSummary {
            kind: kind.clone(),
            cycles: c.cycles,
            rows_accumulated: c.rows_accumulated,
            rows_skipped: c.rows_skipped,
            avg_rows_per_cycle: if c.cycles > 0 {
                c.rows_accumulated as f64 / c.cycles as f64
            } else {
                0.0
            },
        })
        .collect();

    aggregation_counters.sort_by(|a, b| {
        match b.rows_accumulated.cmp(&a.rows_accumulated) {
            Ordering::Equal => a.kind.cmp(&b.kind),
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        aggregation_counters,
    }
}
