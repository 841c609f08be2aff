//! The tri-valued domain consumed by the agreement protocol.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A value in `{0, 1, ?}`. Only [`Value::Zero`] and [`Value::One`] are
/// terminal "decided" values; [`Value::Unknown`] is the undecided marker
/// used inside Phase-P tallies and confirm-value computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Zero,
    One,
    Unknown,
}

impl Value {
    /// All three variants, in a fixed order used for tally iteration.
    pub const ALL: [Value; 3] = [Value::Zero, Value::One, Value::Unknown];

    /// Whether this is a terminal decided value (0 or 1).
    pub fn is_terminal(self) -> bool {
        matches!(self, Value::Zero | Value::One)
    }

    /// The deterministic parity coin for round `k`: odd rounds flip to 1,
    /// even rounds to 0. Replaces Ben-Or's random coin (spec.md §9).
    pub fn parity_coin(k: u64) -> Value {
        if k % 2 == 1 {
            Value::One
        } else {
            Value::Zero
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Value::One
        } else {
            Value::Zero
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Zero => write!(f, "0"),
            Value::One => write!(f, "1"),
            Value::Unknown => write!(f, "?"),
        }
    }
}

// The wire format (spec.md §3, §6) is `0`, `1`, or the string `"?"` — not a
// tagged enum — so (de)serialization is hand-written rather than derived.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Zero => serializer.serialize_u8(0),
            Value::One => serializer.serialize_u8(1),
            Value::Unknown => serializer.serialize_str("?"),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0, 1, or \"?\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        match v {
            0 => Ok(Value::Zero),
            1 => Ok(Value::One),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(other),
                &self,
            )),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        match v {
            0 => Ok(Value::Zero),
            1 => Ok(Value::One),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Signed(other),
                &self,
            )),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        match v {
            "?" => Ok(Value::Unknown),
            "0" => Ok(Value::Zero),
            "1" => Ok(Value::One),
            other => Err(de::Error::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_coin_alternates() {
        assert_eq!(Value::parity_coin(1), Value::One);
        assert_eq!(Value::parity_coin(2), Value::Zero);
        assert_eq!(Value::parity_coin(3), Value::One);
        assert_eq!(Value::parity_coin(4), Value::Zero);
    }

    #[test]
    fn only_zero_and_one_are_terminal() {
        assert!(Value::Zero.is_terminal());
        assert!(Value::One.is_terminal());
        assert!(!Value::Unknown.is_terminal());
    }

    #[test]
    fn wire_round_trips() {
        assert_eq!(serde_json::to_string(&Value::Zero).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Value::One).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Value::Unknown).unwrap(), "\"?\"");

        assert_eq!(
            serde_json::from_str::<Value>("0").unwrap(),
            Value::Zero
        );
        assert_eq!(
            serde_json::from_str::<Value>("\"?\"").unwrap(),
            Value::Unknown
        );
    }

    #[test]
    fn rejects_out_of_domain_values() {
        assert!(serde_json::from_str::<Value>("2").is_err());
        assert!(serde_json::from_str::<Value>("\"x\"").is_err());
    }
}
