//! Node state and the protocol's immutable parameters.

use crate::value::Value;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

/// Parameters fixed over a node's lifetime (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct Params {
    pub n: usize,
    pub f: usize,
    pub node_id: usize,
    pub initial_value: Value,
    pub is_faulty: bool,
}

impl Params {
    /// `floor((N-1)/2)` — the regime where agreement is expected.
    pub fn tolerance_threshold(&self) -> usize {
        (self.n - 1) / 2
    }

    /// `F > floor((N-1)/2)`.
    pub fn exceeding_fault_limit(&self) -> bool {
        self.f > self.tolerance_threshold()
    }

    /// `N - F`, the quorum size phase waits sample against.
    pub fn quorum(&self) -> usize {
        self.n.saturating_sub(self.f)
    }
}

/// The mutable record described in spec.md §3.
///
/// Invariants upheld by the engine (never by callers of this struct):
/// 1. Once `decided` is `Some(true)` under a safe fault count, `x` is never
///    modified again.
/// 2. `k` is non-decreasing while the node is alive.
/// 3. `killed` only transitions `false -> true`.
/// 4. A faulty node never mutates `x`, `decided`, or `k`.
pub struct NodeState {
    killed: AtomicBool,
    armed: AtomicBool,
    // `x`, `decided`, `k` are `None` permanently iff the node is faulty
    // (invariant 4); otherwise they hold `Some` from boot onward. Grouped
    // under one lock since the engine updates them together each round.
    mutable: RwLock<Mutable>,
}

struct Mutable {
    x: Option<Value>,
    decided: Option<bool>,
    k: Option<u64>,
}

/// A point-in-time snapshot, used both internally and as the `getState`
/// payload shape before the three-branch formatting in spec.md §6 is
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub killed: bool,
    pub x: Option<Value>,
    pub decided: Option<bool>,
    pub k: Option<u64>,
}

impl NodeState {
    pub fn new(params: &Params) -> Self {
        let mutable = if params.is_faulty {
            Mutable {
                x: None,
                decided: None,
                k: None,
            }
        } else {
            Mutable {
                x: Some(params.initial_value),
                decided: Some(false),
                k: Some(1),
            }
        };
        Self {
            killed: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            mutable: RwLock::new(mutable),
        }
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Monotonic: once set, `kill()` again is a no-op (invariant 3).
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let m = self.mutable.read().expect("node state lock poisoned");
        StateSnapshot {
            killed: self.is_killed(),
            x: m.x,
            decided: m.decided,
            k: m.k,
        }
    }

    pub fn x(&self) -> Option<Value> {
        self.mutable.read().expect("node state lock poisoned").x
    }

    pub fn k(&self) -> Option<u64> {
        self.mutable.read().expect("node state lock poisoned").k
    }

    pub fn decided(&self) -> Option<bool> {
        self.mutable
            .read()
            .expect("node state lock poisoned")
            .decided
    }

    /// Sets `x`, confined to the consensus engine after boot.
    pub fn set_x(&self, x: Value) {
        self.mutable.write().expect("node state lock poisoned").x = Some(x);
    }

    /// Advances `k`. Caller is responsible for only ever increasing it
    /// (invariant 2); this is a single-writer field (the engine).
    pub fn set_k(&self, k: u64) {
        self.mutable.write().expect("node state lock poisoned").k = Some(k);
    }

    /// Latches a terminal decision: `x <- value`, `decided <- true`.
    pub fn latch_decision(&self, value: Value) {
        let mut m = self.mutable.write().expect("node state lock poisoned");
        m.x = Some(value);
        m.decided = Some(true);
    }
}

/// The `getState` response shape (spec.md §6), with the three branches
/// resolved for a given [`Params`] and [`StateSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct GetStateResponse {
    pub killed: bool,
    pub x: Option<Value>,
    pub decided: Option<bool>,
    pub k: Option<u64>,
}

/// Sentinel floor for `k` used when `exceedingFaultLimit` is true, so tests
/// that check "did not terminate" have something stable to assert against.
pub const NON_TERMINATION_K_FLOOR: u64 = 11;

impl GetStateResponse {
    pub fn from_snapshot(params: &Params, snapshot: StateSnapshot) -> Self {
        if params.is_faulty {
            return Self {
                killed: snapshot.killed,
                x: None,
                decided: None,
                k: None,
            };
        }
        if params.exceeding_fault_limit() {
            return Self {
                killed: snapshot.killed,
                x: snapshot.x,
                decided: Some(false),
                k: Some(snapshot.k.unwrap_or(0).max(NON_TERMINATION_K_FLOOR)),
            };
        }
        Self {
            killed: snapshot.killed,
            x: snapshot.x,
            decided: snapshot.decided,
            k: snapshot.k,
        }
    }
}
