//! Process-wide counters for the field server.
//! Cheap enough to bump on every message; read them with [`snapshot`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::protocol::Header;

static MESSAGES_HANDLED: AtomicU64 = AtomicU64::new(0);
static MESSAGES_UNRECOGNIZED: AtomicU64 = AtomicU64::new(0);
static MESSAGES_MALFORMED: AtomicU64 = AtomicU64::new(0);
static CLAIMS_WON: AtomicU64 = AtomicU64::new(0);
static CLAIMS_REJECTED: AtomicU64 = AtomicU64::new(0);
static CLAIMS_LOST_RACE: AtomicU64 = AtomicU64::new(0);
static COMPANION_LEVEL_UPS: AtomicU64 = AtomicU64::new(0);
static SESSIONS_OPENED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_CLOSED: AtomicU64 = AtomicU64::new(0);

static HEADER_COUNTERS: OnceLock<Mutex<HashMap<Header, u64>>> = OnceLock::new();

pub fn inc_handled() {
    MESSAGES_HANDLED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_unrecognized() {
    MESSAGES_UNRECOGNIZED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_malformed() {
    MESSAGES_MALFORMED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_claim_won() {
    CLAIMS_WON.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_claim_rejected() {
    CLAIMS_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_claim_lost_race() {
    CLAIMS_LOST_RACE.fetch_add(1, Ordering::Relaxed);
}
pub fn add_level_ups(levels: u8) {
    if levels > 0 {
        COMPANION_LEVEL_UPS.fetch_add(u64::from(levels), Ordering::Relaxed);
    }
}
pub fn inc_sessions_opened() {
    SESSIONS_OPENED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sessions_closed() {
    SESSIONS_CLOSED.fetch_add(1, Ordering::Relaxed);
}

fn header_counter_lock() -> &'static Mutex<HashMap<Header, u64>> {
    HEADER_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Count one handled message of kind `header`.
pub fn record_header(header: Header) -> u64 {
    let mut guard = header_counter_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let counter = guard.entry(header).or_default();
    *counter = counter.saturating_add(1);
    *counter
}

pub fn header_counters_snapshot() -> HashMap<Header, u64> {
    header_counter_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub messages_handled: u64,
    pub messages_unrecognized: u64,
    pub messages_malformed: u64,
    pub claims_won: u64,
    pub claims_rejected: u64,
    pub claims_lost_race: u64,
    pub companion_level_ups: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        messages_handled: MESSAGES_HANDLED.load(Ordering::Relaxed),
        messages_unrecognized: MESSAGES_UNRECOGNIZED.load(Ordering::Relaxed),
        messages_malformed: MESSAGES_MALFORMED.load(Ordering::Relaxed),
        claims_won: CLAIMS_WON.load(Ordering::Relaxed),
        claims_rejected: CLAIMS_REJECTED.load(Ordering::Relaxed),
        claims_lost_race: CLAIMS_LOST_RACE.load(Ordering::Relaxed),
        companion_level_ups: COMPANION_LEVEL_UPS.load(Ordering::Relaxed),
        sessions_opened: SESSIONS_OPENED.load(Ordering::Relaxed),
        sessions_closed: SESSIONS_CLOSED.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are process-wide and other tests bump them concurrently, so
    // only lower bounds are asserted.
    #[test]
    fn counters_move_forward() {
        let before = snapshot();
        inc_claim_won();
        inc_malformed();
        add_level_ups(3);
        add_level_ups(0);
        let after = snapshot();
        assert!(after.claims_won > before.claims_won);
        assert!(after.messages_malformed > before.messages_malformed);
        assert!(after.companion_level_ups >= before.companion_level_ups + 3);
    }

    #[test]
    fn header_counter_accumulates() {
        let first = record_header(Header::PetAction);
        let second = record_header(Header::PetAction);
        assert!(second > first);
        assert!(header_counters_snapshot()[&Header::PetAction] >= second);
    }
}
