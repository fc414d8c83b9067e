//! Minimal metrics scaffolding.
//! Counters are process-wide and cheap to bump from the game loop; the
//! shutdown summary and tests read them back through snapshots.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static LOGINS: AtomicU64 = AtomicU64::new(0);
static LOGOUTS: AtomicU64 = AtomicU64::new(0);
static COMMANDS: AtomicU64 = AtomicU64::new(0);
static COMMAND_FAILURES: AtomicU64 = AtomicU64::new(0);
static SENDS_DROPPED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_SAVED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_FAILURES: AtomicU64 = AtomicU64::new(0);
static ONLINE_PEAK: AtomicU64 = AtomicU64::new(0);

static COMMAND_COUNTERS: OnceLock<Mutex<HashMap<String, CommandCounter>>> = OnceLock::new();

pub fn inc_logins() {
    LOGINS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_logouts() {
    LOGOUTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sends_dropped() {
    SENDS_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_snapshots_saved() {
    SNAPSHOTS_SAVED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_snapshot_failures() {
    SNAPSHOT_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_online_count(count: u64) {
    ONLINE_PEAK.fetch_max(count, Ordering::Relaxed);
}

/// Per-verb invocation counts, keyed by the canonical verb name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommandCounter {
    pub invocations: u64,
    pub failures: u64,
}

fn command_counter_lock() -> &'static Mutex<HashMap<String, CommandCounter>> {
    COMMAND_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_command(verb: &str) -> CommandCounter {
    COMMANDS.fetch_add(1, Ordering::Relaxed);
    let mut guard = command_counter_lock()
        .lock()
        .expect("command counter mutex poisoned");
    let counter = guard.entry(verb.to_string()).or_default();
    counter.invocations = counter.invocations.saturating_add(1);
    *counter
}

pub fn record_command_failure(verb: &str) -> CommandCounter {
    COMMAND_FAILURES.fetch_add(1, Ordering::Relaxed);
    let mut guard = command_counter_lock()
        .lock()
        .expect("command counter mutex poisoned");
    let counter = guard.entry(verb.to_string()).or_default();
    counter.failures = counter.failures.saturating_add(1);
    *counter
}

pub fn command_counters_snapshot() -> HashMap<String, CommandCounter> {
    command_counter_lock()
        .lock()
        .expect("command counter mutex poisoned")
        .clone()
}

#[cfg(test)]
pub(crate) fn reset_command_counters_for_tests() {
    if let Some(lock) = COMMAND_COUNTERS.get() {
        let mut guard = lock.lock().expect("command counter mutex poisoned");
        guard.clear();
    }
}


#[derive(Debug, Default, Clone)]
#[allow(dead_code)] // Fields read primarily in tests and the shutdown summary
pub struct Snapshot {
    pub logins: u64,
    pub logouts: u64,
    pub commands: u64,
    pub command_failures: u64,
    pub sends_dropped: u64,
    pub snapshots_saved: u64,
    pub snapshot_failures: u64,
    pub online_peak: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        logins: LOGINS.load(Ordering::Relaxed),
        logouts: LOGOUTS.load(Ordering::Relaxed),
        commands: COMMANDS.load(Ordering::Relaxed),
        command_failures: COMMAND_FAILURES.load(Ordering::Relaxed),
        sends_dropped: SENDS_DROPPED.load(Ordering::Relaxed),
        snapshots_saved: SNAPSHOTS_SAVED.load(Ordering::Relaxed),
        snapshot_failures: SNAPSHOT_FAILURES.load(Ordering::Relaxed),
        online_peak: ONLINE_PEAK.load(Ordering::Relaxed),
    }
}
