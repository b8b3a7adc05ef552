//! Node configuration file

use crate::error::{NodeError, NodeResult};
use pob_primitives::{AccountId, Amount};
use pob_verifier::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whole node configuration, one TOML table per concern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identity and committee
    pub consensus: ConsensusConfig,
    /// Contract execution bounds
    pub executor: ExecutorConfig,
    /// Where state and blocks live
    pub storage: StorageConfig,
    /// Initial state
    pub genesis: GenesisConfig,
}

/// `[consensus]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// This node's account id
    pub identity: String,
    /// Witness committee; order does not matter
    pub witnesses: Vec<String>,
    /// How often the producer loop checks the schedule
    pub tick_ms: u64,
    /// Most transactions taken from the mempool per block
    pub max_block_transactions: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            identity: "node0".to_string(),
            witnesses: vec!["node0".to_string()],
            tick_ms: 500,
            max_block_transactions: 1_000,
        }
    }
}

/// `[executor]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Wall-clock budget per transaction
    pub timeout_ms: u64,
    /// Instruction bound per transaction
    pub max_steps: u64,
    /// Nested call bound per transaction
    pub max_call_depth: usize,
    /// Reject unsigned transactions
    pub require_signatures: bool,
    /// Lowest accepted gas price
    pub min_gas_price: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let defaults = VerifierConfig::default();
        Self {
            timeout_ms: defaults.timeout.as_millis() as u64,
            max_steps: defaults.max_steps,
            max_call_depth: defaults.max_call_depth,
            require_signatures: defaults.require_signatures,
            min_gas_price: defaults.min_gas_price,
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// RocksDB directory
    pub data_dir: PathBuf,
    /// Keep everything in memory instead
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            in_memory: false,
        }
    }
}

/// `[genesis]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Initial balances by account id
    pub balances: BTreeMap<String, i64>,
}

impl NodeConfig {
    /// Read and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> NodeResult<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> NodeResult<String> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Check ids and bounds
    pub fn validate(&self) -> NodeResult<()> {
        self.identity()?;
        self.witnesses()?;
        self.genesis_balances()?;
        if self.consensus.tick_ms == 0 {
            return Err(NodeError::Config("consensus.tick_ms must be positive".into()));
        }
        if self.executor.timeout_ms == 0 {
            return Err(NodeError::Config("executor.timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// This node's account id
    pub fn identity(&self) -> NodeResult<AccountId> {
        Ok(AccountId::parse(&self.consensus.identity)?)
    }

    /// Witness committee
    pub fn witnesses(&self) -> NodeResult<Vec<AccountId>> {
        self.consensus
            .witnesses
            .iter()
            .map(|w| AccountId::parse(w).map_err(NodeError::from))
            .collect()
    }

    /// Genesis balances; negative amounts are refused
    pub fn genesis_balances(&self) -> NodeResult<Vec<(AccountId, Amount)>> {
        self.genesis
            .balances
            .iter()
            .map(|(account, amount)| {
                if *amount < 0 {
                    return Err(NodeError::Config(format!(
                        "genesis balance of {account} is negative"
                    )));
                }
                Ok((AccountId::parse(account)?, Amount::from(*amount)))
            })
            .collect()
    }

    /// Producer loop period
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.consensus.tick_ms)
    }

    /// Bounds handed to the verification pipeline
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            timeout: Duration::from_millis(self.executor.timeout_ms),
            max_steps: self.executor.max_steps,
            max_call_depth: self.executor.max_call_depth,
            require_signatures: self.executor.require_signatures,
            min_gas_price: self.executor.min_gas_price,
        }
    }
}
