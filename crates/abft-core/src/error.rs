//! Error taxonomy (spec.md §7). Most of the taxonomy is *behavioral*, not
//! typed: transient peer unreachability is silently swallowed by the
//! [`crate::broadcaster::Broadcaster`] impl, and phase-wait timeouts are
//! non-errors the engine proceeds past. [`ConsensusError`] exists only for
//! the handful of cases that must surface as an `Err` to a caller — the
//! control surface's ingress validation (malformed `/message` bodies) and
//! the start-while-disabled rejections.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] crate::message::MsgValidationError),

    #[error("cannot start: node is faulty")]
    StartWhileFaulty,

    #[error("cannot start: node is killed")]
    StartWhileKilled,
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
