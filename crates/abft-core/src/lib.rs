//! Core binary agreement protocol: the per-node consensus state machine —
//! rounds, two-phase message accumulation, majority decision rules,
//! decision latching, and the concurrent inbox that feeds them.
//!
//! This crate is transport-agnostic. It has no opinion on how messages
//! cross the wire between nodes; callers supply a [`broadcaster::Broadcaster`]
//! implementation. `abft-node` is the binary that wires this crate to a
//! real HTTP transport.
//!
//! ## Modules
//!
//! - [`value`] - the tri-valued domain `{0, 1, ?}`
//! - [`message`] - wire message shape and ingress validation
//! - [`state`] - per-node mutable state and its wire snapshot
//! - [`inbox`] - round-indexed, phase-indexed message tallies
//! - [`broadcaster`] - the delivery contract and readiness gate
//! - [`coin`] - the round-9 tie-breaker (deterministic by default)
//! - [`engine`] - the ten-step per-round algorithm
//! - [`control`] - the five control-surface operations
//! - [`error`] - the error taxonomy surfaced to callers

pub mod broadcaster;
pub mod coin;
pub mod control;
pub mod engine;
pub mod error;
pub mod inbox;
pub mod message;
pub mod state;
pub mod value;

pub use broadcaster::{Broadcaster, InMemoryBroadcaster, Readiness};
pub use coin::{Coin, ParityCoin, RandomCoin};
pub use control::{Node, Status};
pub use engine::{ConsensusEngine, NoopObserver, RoundObserver, RoundOutcome, RoundTiming};
pub use error::{ConsensusError, Result};
pub use inbox::Inbox;
pub use message::{MsgPayload, MsgValidationError, Phase, RawMsgPayload};
pub use state::{GetStateResponse, NodeState, Params, StateSnapshot, NON_TERMINATION_K_FLOOR};
pub use value::Value;
