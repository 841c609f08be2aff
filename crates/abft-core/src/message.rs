//! Wire message shape and the two broadcast phases.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two phases of a round: "report" and "propose/confirm".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    R,
    P,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::R => write!(f, "R"),
            Phase::P => write!(f, "P"),
        }
    }
}

/// A message as it appears on the wire: `{ type, round, val, sender }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPayload {
    #[serde(rename = "type")]
    pub phase: Phase,
    pub round: u64,
    pub val: Value,
    pub sender: usize,
}

/// The same payload before validation: any field may be absent or
/// malformed. `/message` (spec.md §4.4, §6) rejects this with a 4xx when
/// `type`, `round`, or `val` is missing or out of domain.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMsgPayload {
    #[serde(rename = "type")]
    pub phase: Option<String>,
    pub round: Option<u64>,
    pub val: Option<serde_json::Value>,
    pub sender: Option<usize>,
}

/// Why a [`RawMsgPayload`] failed to validate into a [`MsgPayload`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MsgValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("type must be \"R\" or \"P\", got {0:?}")]
    InvalidPhase(String),
    #[error("val must be 0, 1, or \"?\"")]
    InvalidValue,
    #[error("round must be a positive integer")]
    InvalidRound,
}

impl RawMsgPayload {
    /// Validates an ingress message per spec.md §4.4: `type`, `round`, and
    /// `val` are required; `type` must be `R`/`P`; `val` must be `0`, `1`,
    /// or `"?"`. `sender` is accepted if present but not required to be
    /// valid for acceptance (the tally only cares about phase/round/value).
    pub fn validate(self) -> Result<MsgPayload, MsgValidationError> {
        let phase_str = self.phase.ok_or(MsgValidationError::MissingField("type"))?;
        let phase = match phase_str.as_str() {
            "R" => Phase::R,
            "P" => Phase::P,
            _ => return Err(MsgValidationError::InvalidPhase(phase_str)),
        };

        let round = self.round.ok_or(MsgValidationError::MissingField("round"))?;
        if round == 0 {
            return Err(MsgValidationError::InvalidRound);
        }

        let raw_val = self.val.ok_or(MsgValidationError::MissingField("val"))?;
        let val: Value =
            serde_json::from_value(raw_val).map_err(|_| MsgValidationError::InvalidValue)?;

        Ok(MsgPayload {
            phase,
            round,
            val,
            sender: self.sender.unwrap_or(usize::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_message() {
        let raw = RawMsgPayload {
            phase: Some("R".into()),
            round: Some(1),
            val: Some(serde_json::json!(1)),
            sender: Some(2),
        };
        let msg = raw.validate().unwrap();
        assert_eq!(msg.phase, Phase::R);
        assert_eq!(msg.round, 1);
        assert_eq!(msg.val, Value::One);
        assert_eq!(msg.sender, 2);
    }

    #[test]
    fn rejects_missing_type() {
        let raw = RawMsgPayload {
            phase: None,
            round: Some(1),
            val: Some(serde_json::json!(0)),
            sender: Some(0),
        };
        assert_eq!(
            raw.validate().unwrap_err(),
            MsgValidationError::MissingField("type")
        );
    }

    #[test]
    fn rejects_bad_phase() {
        let raw = RawMsgPayload {
            phase: Some("Q".into()),
            round: Some(1),
            val: Some(serde_json::json!(0)),
            sender: Some(0),
        };
        assert!(matches!(
            raw.validate().unwrap_err(),
            MsgValidationError::InvalidPhase(_)
        ));
    }

    #[test]
    fn rejects_bad_value() {
        let raw = RawMsgPayload {
            phase: Some("P".into()),
            round: Some(1),
            val: Some(serde_json::json!(5)),
            sender: Some(0),
        };
        assert_eq!(raw.validate().unwrap_err(), MsgValidationError::InvalidValue);
    }

    #[test]
    fn accepts_unknown_value() {
        let raw = RawMsgPayload {
            phase: Some("P".into()),
            round: Some(3),
            val: Some(serde_json::json!("?")),
            sender: Some(0),
        };
        assert_eq!(raw.validate().unwrap().val, Value::Unknown);
    }
}
