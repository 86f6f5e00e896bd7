use alloy_primitives::{Address, U256};
use config::{NetworkConfig, NetworkConfigBuilder, NetworkType};
use monitor::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Top-level refiller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain presets to start from
    #[serde(default = "default_network")]
    pub network: NetworkType,

    /// Faucet (active) chain RPC endpoint url
    pub active_rpc_url: String,

    /// Volatility (helper) chain RPC endpoint url
    pub helper_rpc_url: String,

    /// Faucet contract address on the active chain
    pub faucet_address: Address,

    /// Volatility helper contract address on the helper chain
    pub helper_address: Address,

    /// File holding the persisted refill state
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Seconds between polling ticks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Helper chain blocks searched for the response event
    #[serde(default = "default_helper_lookback_blocks")]
    pub helper_lookback_blocks: u64,

    /// Active chain blocks searched for the refill event
    #[serde(default = "default_active_lookback_blocks")]
    pub active_lookback_blocks: u64,

    /// CCIP explorer base url
    #[serde(default = "default_ccip_explorer_url")]
    pub ccip_explorer_url: String,

    /// Native value sent with the trigger to pay the CCIP fee
    #[serde(default)]
    pub ccip_fee_wei: U256,

    /// Prometheus listener port, disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

const fn default_network() -> NetworkType {
    NetworkType::Testnet
}

fn default_state_file() -> PathBuf {
    PathBuf::from("refill-state.json")
}

const fn default_poll_interval_secs() -> u64 {
    monitor::monitor::POLL_INTERVAL.as_secs()
}

const fn default_helper_lookback_blocks() -> u64 {
    monitor::monitor::HELPER_LOOKBACK_BLOCKS
}

const fn default_active_lookback_blocks() -> u64 {
    monitor::monitor::ACTIVE_LOOKBACK_BLOCKS
}

fn default_ccip_explorer_url() -> String {
    monitor::monitor::CCIP_EXPLORER_URL.to_string()
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Chain presets with the configured contract addresses.
    pub fn network_config(&self) -> eyre::Result<NetworkConfig> {
        let network = NetworkConfigBuilder::from_network_type(self.network)
            .faucet(self.faucet_address)
            .helper(self.helper_address)
            .build();
        network.validate()?;

        Ok(network)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        let mut monitor = MonitorConfig::new(self.faucet_address, self.helper_address)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs.max(1)));
        monitor.helper_lookback_blocks = self.helper_lookback_blocks;
        monitor.active_lookback_blocks = self.active_lookback_blocks;
        monitor.ccip_explorer_url = self.ccip_explorer_url.clone();
        monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        active_rpc_url = "http://localhost:8545"
        helper_rpc_url = "http://localhost:9545"
        faucet_address = "0x1111111111111111111111111111111111111111"
        helper_address = "0x2222222222222222222222222222222222222222"
    "#;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();

        assert_eq!(config.network, NetworkType::Testnet);
        assert_eq!(config.state_file, PathBuf::from("refill-state.json"));
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.helper_lookback_blocks, 100);
        assert_eq!(config.active_lookback_blocks, 50);
        assert_eq!(config.ccip_fee_wei, U256::ZERO);
        assert!(config.metrics_port.is_none());

        let monitor = config.monitor_config();
        assert_eq!(monitor.poll_interval, Duration::from_secs(15));
        assert_eq!(monitor.ccip_explorer_url, "https://ccip.chain.link");
    }

    #[test]
    fn test_network_config_uses_addresses() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let network = config.network_config().unwrap();

        assert_eq!(network.active.faucet, config.faucet_address);
        assert_eq!(network.helper.helper, config.helper_address);
        assert_eq!(network.active.chain_id, 11155111);
    }

    #[test]
    fn test_zero_faucet_is_rejected() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.faucet_address = Address::ZERO;

        assert!(config.network_config().is_err());
    }
}
