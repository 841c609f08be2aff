//! `HttpBroadcaster`: the `reqwest`-backed [`abft_core::Broadcaster`] that
//! ships a node's Phase-R/Phase-P messages to every peer over HTTP
//! (spec.md §4.3). Per-peer failures are swallowed at `debug`, not `warn`,
//! since an unreachable peer is expected and non-exceptional (spec.md §7).

use abft_core::{Broadcaster, MsgPayload, Readiness};
use async_trait::async_trait;
use std::time::Duration;

/// Delivers messages to every peer's `/message` endpoint. Delivery is
/// fanned out concurrently (spec.md §4.3 prefers parallel delivery for
/// latency; ordering across peers is not observable).
pub struct HttpBroadcaster {
    client: reqwest::Client,
    peer_urls: Vec<String>,
}

impl HttpBroadcaster {
    /// `peer_urls` are the base URLs (e.g. `http://127.0.0.1:9001`) of every
    /// *other* node in the cohort — the caller excludes its own address.
    pub fn new(peer_urls: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .expect("reqwest client config is valid");
        Self { client, peer_urls }
    }
}

#[async_trait]
impl Broadcaster for HttpBroadcaster {
    async fn broadcast(&self, msg: MsgPayload) {
        let sends = self.peer_urls.iter().map(|base| {
            let client = self.client.clone();
            let url = format!("{base}/message");
            async move {
                if let Err(err) = client.post(&url).json(&msg).send().await {
                    tracing::debug!(peer = %url, error = %err, "peer unreachable, message dropped");
                }
            }
        });
        futures::future::join_all(sends).await;
    }
}

/// Polls every peer's `/status` until at least `min_peers` answer (any
/// status code counts as "reachable" — even a faulty peer's 500 proves the
/// network path works) or `timeout` elapses, then marks `readiness` ready.
/// This is `abft-node`'s concrete stand-in for the readiness barrier
/// spec.md §6 treats as externally supplied (SPEC_FULL.md's readiness
/// module).
pub async fn probe_until_ready(
    client: &reqwest::Client,
    peer_urls: &[String],
    min_peers: usize,
    readiness: &Readiness,
    timeout: Duration,
    poll_interval: Duration,
) {
    if peer_urls.is_empty() || min_peers == 0 {
        readiness.mark_ready();
        return;
    }

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let mut reachable = 0usize;
        for base in peer_urls {
            let url = format!("{base}/status");
            if client.get(&url).send().await.is_ok() {
                reachable += 1;
            }
        }
        if reachable >= min_peers {
            tracing::info!(reachable, min_peers, "network ready");
            readiness.mark_ready();
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(
                reachable,
                min_peers,
                "readiness probe timed out, proceeding anyway"
            );
            readiness.mark_ready();
            return;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_peer_list_marks_ready_immediately() {
        let readiness = Readiness::new();
        let client = reqwest::Client::new();
        probe_until_ready(
            &client,
            &[],
            0,
            &readiness,
            Duration::from_millis(10),
            Duration::from_millis(1),
        )
        .await;
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn unreachable_peers_still_become_ready_after_timeout() {
        let readiness = Readiness::new();
        let client = reqwest::Client::new();
        probe_until_ready(
            &client,
            &["http://127.0.0.1:1".to_string()],
            1,
            &readiness,
            Duration::from_millis(30),
            Duration::from_millis(5),
        )
        .await;
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn broadcast_to_unreachable_peers_does_not_panic() {
        let b = HttpBroadcaster::new(vec!["http://127.0.0.1:1".to_string()]);
        b.broadcast(MsgPayload {
            phase: abft_core::Phase::R,
            round: 1,
            val: abft_core::Value::Zero,
            sender: 0,
        })
        .await;
    }
}
