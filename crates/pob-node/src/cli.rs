//! Command line

use crate::config::NodeConfig;
use crate::error::NodeResult;
use clap::Parser;
use std::path::PathBuf;

/// PoB ledger node
#[derive(Parser, Debug, Clone)]
#[command(name = "pob-node")]
#[command(about = "Proof-of-Believability ledger node")]
#[command(version)]
pub struct Cli {
    /// TOML config file; built-in defaults when absent
    #[arg(long, short = 'c', env = "POB_CONFIG")]
    pub config: Option<PathBuf>,

    /// This node's account id
    #[arg(long)]
    pub identity: Option<String>,

    /// Witness committee (comma-separated account ids)
    #[arg(long, value_delimiter = ',')]
    pub witnesses: Option<Vec<String>>,

    /// Data directory for the database
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep state and blocks in memory
    #[arg(long)]
    pub in_memory: bool,

    /// Per-transaction wall-clock budget in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Run every witness of the committee in this process
    #[arg(long)]
    pub local_cluster: bool,

    /// Submit this many demo transfers per second from the first funded account
    #[arg(long, default_value_t = 0)]
    pub demo_tps: u32,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Load the config file, if any, and apply flag overrides
    pub fn node_config(&self) -> NodeResult<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };
        if let Some(identity) = &self.identity {
            config.consensus.identity = identity.clone();
        }
        if let Some(witnesses) = &self.witnesses {
            config.consensus.witnesses = witnesses.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = dir.clone();
        }
        if self.in_memory {
            config.storage.in_memory = true;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.executor.timeout_ms = timeout_ms;
        }
        config.validate()?;
        Ok(config)
    }
}
