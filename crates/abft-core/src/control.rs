//! The Control Surface (spec.md §4.4): five operations exposed to the
//! environment, independent of any HTTP framework. `abft-node::api` adapts
//! these to the routes in spec.md §6.

use crate::broadcaster::{Broadcaster, Readiness};
use crate::engine::{ConsensusEngine, NoopObserver, RoundObserver, RoundTiming};
use crate::error::{ConsensusError, Result};
use crate::inbox::Inbox;
use crate::message::RawMsgPayload;
use crate::state::{GetStateResponse, NodeState, Params};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Result of `status`: "live" (2xx) or "faulty" (5xx), per spec.md §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Live,
    Faulty,
}

/// A single node: parameters, shared state, inbox, and the engine used to
/// drive rounds once `start` is called. Owns the lifecycle of the
/// background round-loop task.
pub struct Node {
    params: Params,
    state: Arc<NodeState>,
    inbox: Arc<Inbox>,
    engine: Arc<ConsensusEngine>,
    readiness: Readiness,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    pub fn new(params: Params, broadcaster: Arc<dyn Broadcaster>, readiness: Readiness) -> Self {
        Self::with_engine_config(
            params,
            broadcaster,
            readiness,
            Inbox::new(),
            RoundTiming::default(),
            Arc::new(NoopObserver),
        )
    }

    /// Like [`Node::new`], but lets a caller outside this crate (e.g.
    /// `abft-node`'s wiring of config-driven timing, the dedupe-by-sender
    /// inbox toggle, and a Prometheus [`RoundObserver`]) customize the
    /// engine the node drives without depending on any of those concerns
    /// from this crate.
    pub fn with_engine_config(
        params: Params,
        broadcaster: Arc<dyn Broadcaster>,
        readiness: Readiness,
        inbox: Inbox,
        timing: RoundTiming,
        observer: Arc<dyn RoundObserver>,
    ) -> Self {
        let state = Arc::new(NodeState::new(&params));
        let inbox = Arc::new(inbox);
        let engine = Arc::new(
            ConsensusEngine::new(
                params,
                state.clone(),
                inbox.clone(),
                broadcaster,
                readiness.clone(),
            )
            .with_timing(timing)
            .with_observer(observer),
        );
        Self {
            params,
            state,
            inbox,
            engine,
            readiness,
            task: Mutex::new(None),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    pub fn inbox(&self) -> &Arc<Inbox> {
        &self.inbox
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// `GET /status` (spec.md §6): "live" unless the node is faulty.
    pub fn handle_status(&self) -> Status {
        if self.params.is_faulty {
            Status::Faulty
        } else {
            Status::Live
        }
    }

    /// `POST /message` (spec.md §4.4, §6): validate, prepare the round,
    /// increment the tally. A no-op (but still 2xx) when killed or faulty.
    pub fn handle_message(&self, raw: RawMsgPayload) -> Result<()> {
        let msg = raw.validate().map_err(ConsensusError::from)?;
        if self.state.is_killed() || self.params.is_faulty {
            return Ok(());
        }
        self.inbox.prepare(msg.round);
        self.inbox.record(msg.phase, msg.round, msg.val, msg.sender);
        Ok(())
    }

    /// `GET /start` (spec.md §6): arms the engine and schedules the
    /// consensus loop. Rejected (without arming) if faulty or killed.
    pub fn handle_start(&self) -> Result<()> {
        if self.params.is_faulty {
            return Err(ConsensusError::StartWhileFaulty);
        }
        if self.state.is_killed() {
            return Err(ConsensusError::StartWhileKilled);
        }

        let mut task = self.task.lock();
        if task.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return Ok(()); // already running; starting twice is a no-op
        }

        let engine = self.engine.clone();
        *task = Some(tokio::spawn(async move {
            engine.run().await;
        }));
        Ok(())
    }

    /// `GET /stop` (spec.md §6): disarms the engine and sets `killed`.
    /// Always succeeds.
    pub fn handle_stop(&self) {
        self.state.kill();
    }

    /// `GET /getState` (spec.md §6): a snapshot formatted per the
    /// three-branch shape.
    pub fn handle_get_state(&self) -> GetStateResponse {
        GetStateResponse::from_snapshot(&self.params, self.state.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::InMemoryBroadcaster;
    use crate::value::Value;

    fn node(params: Params) -> Arc<Node> {
        let broadcaster = Arc::new(InMemoryBroadcaster::new(params.node_id, vec![]));
        Arc::new(Node::new(params, broadcaster, Readiness::always_ready()))
    }

    fn params(is_faulty: bool) -> Params {
        Params {
            n: 3,
            f: 0,
            node_id: 0,
            initial_value: Value::Zero,
            is_faulty,
        }
    }

    #[test]
    fn status_reflects_faulty_flag() {
        assert_eq!(node(params(false)).handle_status(), Status::Live);
        assert_eq!(node(params(true)).handle_status(), Status::Faulty);
    }

    #[tokio::test]
    async fn start_rejected_when_faulty() {
        let n = node(params(true));
        assert_eq!(n.handle_start().unwrap_err(), ConsensusError::StartWhileFaulty);
    }

    #[tokio::test]
    async fn start_rejected_after_stop() {
        let n = node(params(false));
        n.handle_stop();
        assert_eq!(n.handle_start().unwrap_err(), ConsensusError::StartWhileKilled);
    }

    #[test]
    fn message_is_rejected_when_malformed() {
        let n = node(params(false));
        let raw = RawMsgPayload {
            phase: None,
            round: Some(1),
            val: Some(serde_json::json!(0)),
            sender: Some(1),
        };
        assert!(n.handle_message(raw).is_err());
    }

    #[test]
    fn message_is_counted_when_valid() {
        let n = node(params(false));
        let raw = RawMsgPayload {
            phase: Some("R".into()),
            round: Some(1),
            val: Some(serde_json::json!(1)),
            sender: Some(1),
        };
        n.handle_message(raw).unwrap();
        assert_eq!(
            n.inbox().count(crate::message::Phase::R, 1, Value::One),
            1
        );
    }

    #[test]
    fn message_is_no_op_once_killed() {
        let n = node(params(false));
        n.handle_stop();
        let raw = RawMsgPayload {
            phase: Some("R".into()),
            round: Some(1),
            val: Some(serde_json::json!(1)),
            sender: Some(1),
        };
        n.handle_message(raw).unwrap();
        assert_eq!(
            n.inbox().count(crate::message::Phase::R, 1, Value::One),
            0
        );
    }

    #[test]
    fn get_state_matches_boot_snapshot() {
        let n = node(params(false));
        let resp = n.handle_get_state();
        assert_eq!(resp.x, Some(Value::Zero));
        assert_eq!(resp.decided, Some(false));
        assert_eq!(resp.k, Some(1));
    }
}
