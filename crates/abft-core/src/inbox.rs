//! Round-indexed tallies of inbound messages by phase and value.
//!
//! Spec.md §4.2: `prepare` idempotently zero-fills a round's tally,
//! `record` increments a single cell, `count` reads one back. Counters are
//! monotonically non-decreasing and senders are not deduped by default —
//! a peer that sends the same message twice is counted twice. This is a
//! deliberate simplification (spec.md §9); SPEC_FULL.md's optional
//! `dedupe` flag adds a per-(phase, round, sender) seen-set without
//! changing any of this when left at its default `false`.

use crate::message::Phase;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-round tally for one phase: atomic counters indexed by [`Value`].
#[derive(Debug, Default)]
struct Tally {
    zero: AtomicU64,
    one: AtomicU64,
    unknown: AtomicU64,
}

impl Tally {
    fn cell(&self, val: Value) -> &AtomicU64 {
        match val {
            Value::Zero => &self.zero,
            Value::One => &self.one,
            Value::Unknown => &self.unknown,
        }
    }
}

/// The concurrent inbox: one tally per (phase, round), created lazily on
/// first touch and kept for the lifetime of the node.
pub struct Inbox {
    tallies: Mutex<HashMap<(Phase, u64), std::sync::Arc<Tally>>>,
    dedupe: bool,
    seen: Mutex<HashSet<(Phase, u64, usize)>>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    /// A plain inbox with spec.md's default (no sender dedup).
    pub fn new() -> Self {
        Self {
            tallies: Mutex::new(HashMap::new()),
            dedupe: false,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// An inbox that drops repeated (phase, round, sender) records. See
    /// SPEC_FULL.md's "dedupe-by-sender toggle" supplement.
    pub fn with_dedupe() -> Self {
        Self {
            tallies: Mutex::new(HashMap::new()),
            dedupe: true,
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn tally_for(&self, phase: Phase, round: u64) -> std::sync::Arc<Tally> {
        let mut tallies = self.tallies.lock();
        tallies
            .entry((phase, round))
            .or_insert_with(|| std::sync::Arc::new(Tally::default()))
            .clone()
    }

    /// Idempotently ensures both (R, round) and (P, round) tallies exist.
    pub fn prepare(&self, round: u64) {
        self.tally_for(Phase::R, round);
        self.tally_for(Phase::P, round);
    }

    /// Increments `inbox[phase][round][val]` by 1, preparing the round
    /// first if needed. Returns `false` (without incrementing) if dedupe is
    /// enabled and this exact `(phase, round, sender)` was already seen.
    pub fn record(&self, phase: Phase, round: u64, val: Value, sender: usize) -> bool {
        if self.dedupe {
            let key = (phase, round, sender);
            let mut seen = self.seen.lock();
            if !seen.insert(key) {
                return false;
            }
        }
        let tally = self.tally_for(phase, round);
        tally.cell(val).fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Reads the current counter, 0 if the round was never prepared.
    pub fn count(&self, phase: Phase, round: u64, val: Value) -> u64 {
        let tallies = self.tallies.lock();
        tallies
            .get(&(phase, round))
            .map(|t| t.cell(val).load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// `count(phase, round, 0) + count(phase, round, 1)`, the threshold the
    /// engine's phase waits sample against.
    pub fn decided_count(&self, phase: Phase, round: u64) -> u64 {
        self.count(phase, round, Value::Zero) + self.count(phase, round, Value::One)
    }
}
