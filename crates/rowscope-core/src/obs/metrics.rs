use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, MutexGuard, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for engine and executor operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Plan assembly
    pub plans_flat: u64,
    pub plans_staged: u64,
    pub plans_dedup: u64,

    // Filtering decisions
    pub clauses_dropped: u64,
    pub sorts_ignored: u64,
    pub role_policy_misses: u64,
    pub source_policy_misses: u64,

    // Execution
    pub fetch_calls: u64,
    pub rows_fetched: u64,
    pub count_calls: u64,
    pub batches_applied: u64,
    pub rows_updated: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub plans: u64,
    pub clauses_dropped: u64,
    pub sorts_ignored: u64,
    pub fetch_calls: u64,
    pub rows_fetched: u64,
    pub count_calls: u64,
    pub batches_applied: u64,
    pub rows_updated: u64,
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Counters since `since_ms`; `None` when the window filter excluded them.
    pub counters: Option<EventState>,
}

// Process-wide: events recorded on any worker thread land in one report.
static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

// Counters stay usable after a panic in another recorder.
fn state() -> MutexGuard<'static, EventState> {
    EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&state())
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut state())
}

/// Mutable per-entity counters, created on first use.
pub(crate) fn entity_mut<'a>(m: &'a mut EventState, entity: &str) -> &'a mut EntityCounters {
    m.entities.entry(entity.to_string()).or_default()
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot counters whose window started at or after `window_start_ms`.
#[must_use]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    let in_window = window_start_ms.is_none_or(|start| snap.since_ms >= start);

    EventReport {
        counters: in_window.then_some(snap),
    }
}
