//! The `Broadcaster` contract (spec.md §4.3): deliver a message to every
//! peer, honoring readiness, tolerating per-peer failures.

use crate::message::MsgPayload;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared readiness state consulted by the broadcaster before its first
/// send of a node's lifetime. `abft-node` supplies the concrete gate that
/// flips this (see `SPEC_FULL.md`'s readiness-barrier module); `abft-core`
/// only depends on the boolean predicate.
#[derive(Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Starts already-ready, for tests and single-process cohorts that
    /// don't need a readiness barrier.
    pub fn always_ready() -> Self {
        let r = Self::new();
        r.mark_ready();
        r
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Delivers a [`MsgPayload`] to every peer `i != node_id`. Implementations
/// must:
/// - return immediately, sending nothing, if the node is killed or faulty
///   (checked by the caller, the [`crate::engine::ConsensusEngine`], before
///   invoking this trait — see its round loop);
/// - swallow per-peer delivery failures rather than propagating them,
///   since a single unreachable peer must not block the others (spec.md
///   §4.3, §7).
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, msg: MsgPayload);
}

/// An in-process broadcaster used by `abft-core`'s own tests: instead of a
/// network hop, it directly calls `record` on every peer's inbox. Mirrors
/// the shape of a real transport without depending on `axum`/`reqwest`.
pub struct InMemoryBroadcaster {
    node_id: usize,
    peers: Vec<Arc<crate::inbox::Inbox>>,
}

impl InMemoryBroadcaster {
    pub fn new(node_id: usize, peers: Vec<Arc<crate::inbox::Inbox>>) -> Self {
        Self { node_id, peers }
    }
}

#[async_trait]
impl Broadcaster for InMemoryBroadcaster {
    async fn broadcast(&self, msg: MsgPayload) {
        for (i, peer_inbox) in self.peers.iter().enumerate() {
            if i == self.node_id {
                continue;
            }
            peer_inbox.record(msg.phase, msg.round, msg.val, self.node_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::Inbox;
    use crate::message::Phase;
    use crate::value::Value;

    #[tokio::test]
    async fn broadcast_reaches_every_peer_but_self() {
        let inboxes: Vec<Arc<Inbox>> = (0..3).map(|_| Arc::new(Inbox::new())).collect();
        let b = InMemoryBroadcaster::new(0, inboxes.clone());
        b.broadcast(MsgPayload {
            phase: Phase::R,
            round: 1,
            val: Value::One,
            sender: 0,
        })
        .await;

        assert_eq!(inboxes[0].count(Phase::R, 1, Value::One), 0);
        assert_eq!(inboxes[1].count(Phase::R, 1, Value::One), 1);
        assert_eq!(inboxes[2].count(Phase::R, 1, Value::One), 1);
    }

    #[test]
    fn readiness_starts_unready_unless_always_ready() {
        let r = Readiness::new();
        assert!(!r.is_ready());
        r.mark_ready();
        assert!(r.is_ready());

        assert!(Readiness::always_ready().is_ready());
    }
}
