//! Prometheus metrics for a node process (ambient addition, SPEC_FULL.md).
//!
//! Grounded on `guts-node::observability::metrics`: a `Lazy`-free
//! `Family<Labels, Counter>` registry built once per node (no global
//! `static`, since several nodes can run in one test process) and an
//! `/metrics` handler that encodes it in the Prometheus text format.
//!
//! `abft-core` has no idea this module exists — it only knows about the
//! [`abft_core::RoundObserver`] trait, which [`NodeMetrics`] implements to
//! receive round-started, phase-wait-timeout, and decided events without
//! the core crate depending on `prometheus-client`.

use abft_core::{Phase, RoundObserver, Value};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Label set for the per-phase counters. Phase is stored as its wire
/// string ("R"/"P"), matching `guts-node::observability::metrics`'s
/// convention of plain-`String` label fields over bespoke label enums.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PhaseLabel {
    pub phase: String,
}

impl PhaseLabel {
    fn of(phase: Phase) -> Self {
        Self {
            phase: phase.to_string(),
        }
    }
}

/// This node's counters: rounds started, phase-wait timeouts (by phase),
/// decisions latched, and messages ingested at the API boundary (by
/// phase) — the narrow slice of `guts-node`'s much larger metrics surface
/// that applies to this protocol (SPEC_FULL.md's metrics module).
pub struct NodeMetrics {
    registry: Mutex<Registry>,
    rounds_started: Counter,
    phase_wait_timeouts: Family<PhaseLabel, Counter>,
    decisions_latched: Counter,
    messages_ingested: Family<PhaseLabel, Counter>,
    last_decided_round: AtomicU64,
}

impl NodeMetrics {
    pub fn new(node_id: usize) -> Self {
        let mut registry = Registry::default();

        let rounds_started = Counter::default();
        registry.register(
            format!("abft_node_{node_id}_rounds_started"),
            "Rounds this node has begun executing",
            rounds_started.clone(),
        );

        let phase_wait_timeouts = Family::<PhaseLabel, Counter>::default();
        registry.register(
            format!("abft_node_{node_id}_phase_wait_timeouts"),
            "Phase waits that hit the timeout before reaching N - F",
            phase_wait_timeouts.clone(),
        );

        let decisions_latched = Counter::default();
        registry.register(
            format!("abft_node_{node_id}_decisions_latched"),
            "Terminal decisions this node has latched",
            decisions_latched.clone(),
        );

        let messages_ingested = Family::<PhaseLabel, Counter>::default();
        registry.register(
            format!("abft_node_{node_id}_messages_ingested"),
            "Valid messages accepted on /message, by phase",
            messages_ingested.clone(),
        );

        Self {
            registry: Mutex::new(registry),
            rounds_started,
            phase_wait_timeouts,
            decisions_latched,
            messages_ingested,
            last_decided_round: AtomicU64::new(0),
        }
    }

    /// Called from the `/message` handler after a payload validates,
    /// independent of whether the node is killed or faulty (ingestion at
    /// the API boundary is what's being measured, not consensus effect).
    pub fn record_message_ingested(&self, phase: Phase) {
        self.messages_ingested
            .get_or_create(&PhaseLabel::of(phase))
            .inc();
    }

    pub fn last_decided_round(&self) -> u64 {
        self.last_decided_round.load(Ordering::Relaxed)
    }

    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.lock().expect("metrics registry poisoned");
        prometheus_client::encoding::text::encode(&mut buffer, &registry)
            .expect("prometheus encoding is infallible for this registry");
        buffer
    }
}

impl RoundObserver for NodeMetrics {
    fn round_started(&self, _round: u64) {
        self.rounds_started.inc();
    }

    fn phase_wait_timed_out(&self, phase: Phase, _round: u64) {
        self.phase_wait_timeouts
            .get_or_create(&PhaseLabel::of(phase))
            .inc();
    }

    fn decided(&self, _value: Value, round: u64) {
        self.decisions_latched.inc();
        self.last_decided_round.store(round, Ordering::Relaxed);
    }
}

/// `GET /metrics`, in the Prometheus text exposition format.
pub async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<crate::api::AppState>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_through_the_observer_trait() {
        let metrics = NodeMetrics::new(0);
        metrics.round_started(1);
        metrics.round_started(2);
        metrics.phase_wait_timed_out(Phase::R, 2);
        metrics.decided(Value::One, 2);

        assert_eq!(metrics.last_decided_round(), 2);
        let encoded = metrics.encode();
        assert!(encoded.contains("abft_node_0_rounds_started_total 2"));
        assert!(encoded.contains("abft_node_0_decisions_latched_total 1"));
    }

    #[test]
    fn message_ingestion_is_tracked_per_phase() {
        let metrics = NodeMetrics::new(1);
        metrics.record_message_ingested(Phase::R);
        metrics.record_message_ingested(Phase::R);
        metrics.record_message_ingested(Phase::P);
        let encoded = metrics.encode();
        assert!(encoded.contains("messages_ingested"));
    }
}
