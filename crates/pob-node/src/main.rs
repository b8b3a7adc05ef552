//! PoB ledger node binary

use anyhow::{Context, Result};
use clap::Parser;
use pob_metrics::Metrics;
use pob_network::LocalHub;
use pob_node::cli::Cli;
use pob_node::{contracts, Node, NodeConfig};
use pob_primitives::AccountId;
use pob_types::{Contract, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    tracing::info!("PoB node starting...");
    let config = cli.node_config().context("loading configuration")?;

    let metrics = Arc::new(Metrics::new());
    let hub = LocalHub::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // One node per committee member in cluster mode, otherwise just us
    let identities = if cli.local_cluster {
        config.consensus.witnesses.clone()
    } else {
        vec![config.consensus.identity.clone()]
    };

    let mut nodes = Vec::new();
    let mut handles = Vec::new();
    for identity in identities {
        let mut node_config = config.clone();
        node_config.consensus.identity = identity.clone();
        if cli.local_cluster {
            node_config.storage.data_dir = config.storage.data_dir.join(&identity);
        }
        let bus = Arc::new(hub.connect_with_metrics(identity.clone(), metrics.clone())?);
        let node = Arc::new(
            Node::new(&node_config, bus, metrics.clone())
                .with_context(|| format!("starting node {identity}"))?,
        );
        handles.push(tokio::spawn(node.clone().run(shutdown_rx.clone())));
        nodes.push(node);
    }
    tracing::info!(nodes = nodes.len(), members = ?hub.members(), "nodes started");

    if cli.demo_tps > 0 {
        if let Some(node) = nodes.first() {
            tokio::spawn(demo_load(node.clone(), config.clone(), cli.demo_tps, shutdown_rx.clone()));
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    // Receivers only go away once every node has stopped
    let _ = shutdown_tx.send(true);

    for handle in handles {
        handle.await??;
    }
    match metrics.snapshot().to_json_compact() {
        Ok(json) => tracing::info!(metrics = %json, "final metrics"),
        Err(e) => tracing::warn!(error = %e, "could not render metrics"),
    }
    tracing::info!("PoB node stopped");
    Ok(())
}

/// Submit one transfer to a sink account every `1/tps` seconds
async fn demo_load(node: Arc<Node>, config: NodeConfig, tps: u32, mut shutdown: watch::Receiver<bool>) {
    let publisher = match config.genesis_balances() {
        Ok(balances) => match balances.into_iter().next() {
            Some((account, _)) => account,
            None => {
                tracing::warn!("demo load needs a funded genesis account");
                return;
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "demo load disabled");
            return;
        }
    };
    let code = match contracts::transfer(&AccountId::new("demo-sink"), 1) {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!(error = %e, "demo contract did not assemble");
            return;
        }
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(1) / tps);
    let mut nonce = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let tx = Transaction::new(
                    publisher.clone(),
                    Contract::new(format!("demo-{nonce}"), code.clone()),
                    10_000,
                    1,
                    nonce,
                );
                nonce += 1;
                if let Err(e) = node.submit_transaction(tx) {
                    tracing::warn!(error = %e, "demo transaction not submitted");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
