//! The consensus engine: drives rounds, executes Phase-R and Phase-P,
//! updates node state (spec.md §4.1).

use crate::broadcaster::{Broadcaster, Readiness};
use crate::coin::{Coin, ParityCoin};
use crate::inbox::Inbox;
use crate::message::{MsgPayload, Phase};
use crate::state::{NodeState, Params};
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing knobs for the phase waits and the inter-round yield (spec.md
/// §4.1, §5). The reference values are "on the order of 20-50 ms" for the
/// phase-wait bound and "~50 ms" for the inter-round delay; these are
/// exposed as configuration rather than hardcoded so a deployment can tune
/// for its network (SPEC_FULL.md's configuration module sets them from
/// CLI flags).
#[derive(Debug, Clone, Copy)]
pub struct RoundTiming {
    /// Upper bound on a single phase wait before proceeding with a partial
    /// tally.
    pub phase_wait_timeout: Duration,
    /// Sleep between polls of the tally while waiting for a phase to
    /// reach quorum.
    pub phase_poll_interval: Duration,
    /// Cooperative delay between rounds, giving ingress handlers and the
    /// HTTP layer a chance to drain.
    pub inter_round_delay: Duration,
}

impl Default for RoundTiming {
    fn default() -> Self {
        Self {
            phase_wait_timeout: Duration::from_millis(40),
            phase_poll_interval: Duration::from_millis(5),
            inter_round_delay: Duration::from_millis(50),
        }
    }
}

/// Outcome of running one round, used by tests and by the loop driver to
/// decide whether to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The round latched a terminal decision; the loop should stop (unless
    /// `exceedingFaultLimit`, handled by the caller).
    Decided(Value),
    /// No decision this round; `k` should advance and the loop continue.
    Undecided,
}

/// Observes round-level events without participating in the protocol
/// itself. `abft-core` stays transport- and metrics-agnostic; `abft-node`
/// implements this to feed its Prometheus counters (rounds started,
/// phase-wait timeouts, decisions latched) without the core depending on
/// `prometheus-client`.
pub trait RoundObserver: Send + Sync {
    fn round_started(&self, _round: u64) {}
    fn phase_wait_timed_out(&self, _phase: Phase, _round: u64) {}
    fn decided(&self, _value: Value, _round: u64) {}
}

/// The default observer: does nothing. Used when no caller supplies one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RoundObserver for NoopObserver {}

/// The per-node consensus engine (spec.md §4.1).
pub struct ConsensusEngine {
    params: Params,
    state: Arc<NodeState>,
    inbox: Arc<Inbox>,
    broadcaster: Arc<dyn Broadcaster>,
    readiness: Readiness,
    coin: Arc<dyn Coin>,
    timing: RoundTiming,
    observer: Arc<dyn RoundObserver>,
}

impl ConsensusEngine {
    pub fn new(
        params: Params,
        state: Arc<NodeState>,
        inbox: Arc<Inbox>,
        broadcaster: Arc<dyn Broadcaster>,
        readiness: Readiness,
    ) -> Self {
        Self {
            params,
            state,
            inbox,
            broadcaster,
            readiness,
            coin: Arc::new(ParityCoin),
            timing: RoundTiming::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_coin(mut self, coin: Arc<dyn Coin>) -> Self {
        self.coin = coin;
        self
    }

    pub fn with_timing(mut self, timing: RoundTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RoundObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    pub fn inbox(&self) -> &Arc<Inbox> {
        &self.inbox
    }

    /// Arms the engine and runs rounds until decided (or indefinitely if
    /// `exceedingFaultLimit`), `stop`/`kill` is observed, or the node is
    /// faulty (in which case this returns immediately without running a
    /// single round — spec.md §4.1).
    pub async fn run(&self) {
        if self.params.is_faulty || self.state.is_killed() {
            return;
        }
        self.state.arm();

        loop {
            if !self.should_continue() {
                return;
            }

            let k = match self.state.k() {
                Some(k) => k,
                None => return, // faulty; unreachable given the guard above
            };

            let outcome = self.run_round(k).await;

            if !self.state.is_armed() || self.state.is_killed() {
                return;
            }

            match outcome {
                RoundOutcome::Decided(_) if !self.params.exceeding_fault_limit() => {
                    return;
                }
                RoundOutcome::Decided(_) => {
                    // exceedingFaultLimit: keep running, never re-latch.
                    self.state.set_k(k + 1);
                }
                RoundOutcome::Undecided => {
                    self.state.set_k(k + 1);
                }
            }

            tokio::time::sleep(self.timing.inter_round_delay).await;
        }
    }

    fn should_continue(&self) -> bool {
        if self.state.is_killed() || !self.state.is_armed() {
            return false;
        }
        if self.params.exceeding_fault_limit() {
            return true;
        }
        self.state.decided() != Some(true)
    }

    /// Runs a single round `k` of the ten-step algorithm (spec.md §4.1).
    /// Exposed at crate visibility so unit tests can drive individual
    /// rounds deterministically instead of racing the full loop.
    pub async fn run_round(&self, k: u64) -> RoundOutcome {
        self.observer.round_started(k);

        // Step 1: initialize tallies.
        self.inbox.prepare(k);

        let x = self.state.x();

        // Step 2: self-tally Phase-R (only if x is not null).
        if let Some(x) = x {
            self.inbox.record(Phase::R, k, x, self.params.node_id);
        }

        // Step 3: Phase-R broadcast. A null x is conflated with `?` on the
        // wire (spec.md §4.1 edge cases) and is not self-tallied.
        self.broadcast_phase(Phase::R, k, x.unwrap_or(Value::Unknown))
            .await;

        // Step 4: Phase-R wait.
        self.wait_for_quorum(Phase::R, k).await;

        // Step 5: confirm value from Phase-R tallies.
        let confirm_val = self.confirm_value(k);

        // Step 6: self-tally Phase-P.
        self.inbox
            .record(Phase::P, k, confirm_val, self.params.node_id);

        // Step 7: Phase-P broadcast.
        self.broadcast_phase(Phase::P, k, confirm_val).await;

        // Step 8: Phase-P wait.
        self.wait_for_quorum(Phase::P, k).await;

        // Step 9: decision rule, only from round 2 onward. Round 1 never
        // decides and leaves `x` untouched (spec.md §4.1 edge cases) —
        // step 10 just advances `k`, which the caller (`run`) does.
        if k < 2 {
            return RoundOutcome::Undecided;
        }

        let c0 = self.inbox.count(Phase::P, k, Value::Zero);
        let c1 = self.inbox.count(Phase::P, k, Value::One);
        let final_value = match c0.cmp(&c1) {
            std::cmp::Ordering::Greater => Value::Zero,
            std::cmp::Ordering::Less => Value::One,
            std::cmp::Ordering::Equal => Value::Unknown,
        };

        if final_value.is_terminal() {
            self.state.latch_decision(final_value);
            info!(node = self.params.node_id, round = k, value = %final_value, "decided");
            self.observer.decided(final_value, k);
            return RoundOutcome::Decided(final_value);
        }

        // Step 9 (else): flip the coin.
        let next = self.coin.flip(k);
        self.state.set_x(next);
        debug!(node = self.params.node_id, round = k, next = %next, "round undecided, flipped coin");
        RoundOutcome::Undecided
    }

    fn confirm_value(&self, k: u64) -> Value {
        let half = self.params.n / 2;
        let c0 = self.inbox.count(Phase::R, k, Value::Zero);
        let c1 = self.inbox.count(Phase::R, k, Value::One);
        if c0 as usize > half {
            Value::Zero
        } else if c1 as usize > half {
            Value::One
        } else {
            Value::Unknown
        }
    }

    async fn broadcast_phase(&self, phase: Phase, round: u64, val: Value) {
        if self.params.is_faulty || self.state.is_killed() {
            return;
        }
        self.wait_for_readiness().await;
        if self.state.is_killed() {
            return;
        }
        self.broadcaster
            .broadcast(MsgPayload {
                phase,
                round,
                val,
                sender: self.params.node_id,
            })
            .await;
    }

    async fn wait_for_readiness(&self) {
        const POLL: Duration = Duration::from_millis(100);
        while !self.readiness.is_ready() {
            if self.state.is_killed() {
                return;
            }
            tokio::time::sleep(POLL).await;
        }
    }

    async fn wait_for_quorum(&self, phase: Phase, round: u64) {
        let quorum = self.params.quorum() as u64;
        let deadline = tokio::time::Instant::now() + self.timing.phase_wait_timeout;
        loop {
            if self.inbox.decided_count(phase, round) >= quorum {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    node = self.params.node_id,
                    round,
                    phase = %phase,
                    "phase wait timed out before reaching quorum, proceeding with partial tally"
                );
                self.observer.phase_wait_timed_out(phase, round);
                return;
            }
            if self.state.is_killed() {
                return;
            }
            tokio::time::sleep(self.timing.phase_poll_interval).await;
        }
    }
}
