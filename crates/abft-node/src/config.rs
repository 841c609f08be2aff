//! # Node Configuration
//!
//! CLI-flag-first configuration with environment variable fallbacks
//! (12-factor style) and `validator`-derived validation, the way
//! production node binaries in this codebase are configured.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ABFT_NODE_ID` | This node's index, `0 <= node_id < n` | *required* |
//! | `ABFT_N` | Total node count | *required* |
//! | `ABFT_F` | Declared maximum faulty count | *required* |
//! | `ABFT_INITIAL_VALUE` | This node's initial value, `0` or `1` | *required* |
//! | `ABFT_FAULTY` | Whether this node is faulty | `false` |
//! | `ABFT_BASE_PORT` | HTTP listens on `base_port + node_id` | `9000` |
//! | `ABFT_BIND_HOST` | Interface to bind | `127.0.0.1` |
//! | `ABFT_LOG_LEVEL` | Log level | `info` |

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// CLI/env configuration for a single node process.
#[derive(Parser, Debug, Clone, Serialize, Validate)]
#[command(name = "abft-node")]
#[command(author, version, about = "A single node in a binary agreement cohort")]
pub struct NodeConfig {
    /// This node's index (0 <= node_id < n).
    #[arg(long, env = "ABFT_NODE_ID")]
    pub node_id: usize,

    /// Total node count N.
    #[arg(long, env = "ABFT_N")]
    pub n: usize,

    /// Declared maximum faulty count F.
    #[arg(long, env = "ABFT_F")]
    pub f: usize,

    /// This node's initial value (0 or 1). Ignored if `--faulty` is set.
    #[arg(long, env = "ABFT_INITIAL_VALUE", default_value_t = 0)]
    #[validate(range(min = 0, max = 1))]
    pub initial_value: u8,

    /// Whether this node is faulty (silent, never participates).
    #[arg(long, env = "ABFT_FAULTY", default_value_t = false)]
    pub faulty: bool,

    /// Base port; this node listens on `base_port + node_id`.
    #[arg(long, env = "ABFT_BASE_PORT", default_value_t = 9000)]
    pub base_port: u16,

    /// Interface to bind the HTTP server to.
    #[arg(long, env = "ABFT_BIND_HOST", default_value = "127.0.0.1")]
    pub bind_host: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "ABFT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Upper bound on a single phase wait, in milliseconds.
    #[arg(long, env = "ABFT_PHASE_WAIT_TIMEOUT_MS", default_value_t = 40)]
    #[validate(range(min = 1))]
    pub phase_wait_timeout_ms: u64,

    /// Poll interval while waiting for a phase to reach quorum, in
    /// milliseconds.
    #[arg(long, env = "ABFT_PHASE_POLL_INTERVAL_MS", default_value_t = 5)]
    #[validate(range(min = 1))]
    pub phase_poll_interval_ms: u64,

    /// Cooperative delay between rounds, in milliseconds.
    #[arg(long, env = "ABFT_INTER_ROUND_DELAY_MS", default_value_t = 50)]
    #[validate(range(min = 0))]
    pub inter_round_delay_ms: u64,

    /// Enable per-(phase, round, sender) dedup in the inbox (off by
    /// default; see SPEC_FULL.md's dedupe-by-sender supplement).
    #[arg(long, env = "ABFT_DEDUPE", default_value_t = false)]
    pub dedupe: bool,
}

impl NodeConfig {
    /// Validates cross-field constraints the `validator` derive can't
    /// express on its own (`node_id < n`, `f <= n`).
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.node_id >= self.n {
            return Err(ConfigError::Invalid(format!(
                "node_id {} must be < n {}",
                self.node_id, self.n
            )));
        }
        if self.f > self.n {
            return Err(ConfigError::Invalid(format!(
                "f {} must be <= n {}",
                self.f, self.n
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log level '{}', valid values: {:?}",
                self.log_level, valid_levels
            )));
        }

        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.base_port + self.node_id as u16)
    }

    /// The base URL of peer `i`'s HTTP API.
    pub fn peer_addr(&self, peer_id: usize) -> String {
        format!(
            "http://{}:{}",
            self.bind_host,
            self.base_port + peer_id as u16
        )
    }

    pub fn params(&self) -> abft_core::Params {
        abft_core::Params {
            n: self.n,
            f: self.f,
            node_id: self.node_id,
            initial_value: if self.initial_value == 1 {
                abft_core::Value::One
            } else {
                abft_core::Value::Zero
            },
            is_faulty: self.faulty,
        }
    }

    pub fn timing(&self) -> abft_core::RoundTiming {
        abft_core::RoundTiming {
            phase_wait_timeout: std::time::Duration::from_millis(self.phase_wait_timeout_ms),
            phase_poll_interval: std::time::Duration::from_millis(self.phase_poll_interval_ms),
            inter_round_delay: std::time::Duration::from_millis(self.inter_round_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NodeConfig {
        NodeConfig {
            node_id: 0,
            n: 3,
            f: 1,
            initial_value: 1,
            faulty: false,
            base_port: 9000,
            bind_host: "127.0.0.1".into(),
            log_level: "info".into(),
            phase_wait_timeout_ms: 40,
            phase_poll_interval_ms: 5,
            inter_round_delay_ms: 50,
            dedupe: false,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate_config().is_ok());
    }

    #[test]
    fn node_id_must_be_less_than_n() {
        let mut c = base();
        c.node_id = 3;
        assert!(c.validate_config().is_err());
    }

    #[test]
    fn initial_value_out_of_domain_is_rejected() {
        let mut c = base();
        c.initial_value = 2;
        assert!(c.validate_config().is_err());
    }

    #[test]
    fn peer_addr_derives_from_base_port() {
        let c = base();
        assert_eq!(c.peer_addr(2), "http://127.0.0.1:9002");
        assert_eq!(c.addr(), "127.0.0.1:9000");
    }
}
