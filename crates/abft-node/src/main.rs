//! # abft-node
//!
//! A single node in a binary agreement cohort (spec.md §1-§2). Each node
//! is its own OS process exposing the control surface in spec.md §6 over
//! HTTP; a cohort is `n` of these processes pointed at each other's ports.

use abft_core::{Inbox, Node};
use abft_node::{create_router, AppState, HttpBroadcaster, NodeConfig, NodeMetrics};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::parse();
    config
        .validate_config()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("abft_node={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        node_id = config.node_id,
        n = config.n,
        f = config.f,
        faulty = config.faulty,
        "starting node"
    );

    let peer_urls: Vec<String> = (0..config.n)
        .filter(|&i| i != config.node_id)
        .map(|i| config.peer_addr(i))
        .collect();

    let broadcaster = Arc::new(HttpBroadcaster::new(peer_urls.clone()));
    let readiness = abft_core::Readiness::new();
    let metrics = Arc::new(NodeMetrics::new(config.node_id));

    let inbox = if config.dedupe {
        Inbox::with_dedupe()
    } else {
        Inbox::new()
    };

    let node = Arc::new(Node::with_engine_config(
        config.params(),
        broadcaster,
        readiness.clone(),
        inbox,
        config.timing(),
        metrics.clone(),
    ));

    // Quorum minus self: the number of *other* nodes this node needs to
    // see alive before it starts sampling phases against them.
    let min_peers = config.params().quorum().saturating_sub(1);
    tokio::spawn({
        let readiness = readiness.clone();
        let peer_urls = peer_urls.clone();
        async move {
            let client = reqwest::Client::new();
            abft_node::probe_until_ready(
                &client,
                &peer_urls,
                min_peers,
                &readiness,
                Duration::from_secs(10),
                Duration::from_millis(200),
            )
            .await;
        }
    });

    let state = AppState {
        node: node.clone(),
        metrics,
    };
    let router = create_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    node.handle_stop();
    tracing::info!("node stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
