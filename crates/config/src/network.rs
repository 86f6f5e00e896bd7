//! Network configuration for the refill flow.
//!
//! Provides chain ids and contract addresses for the
//! active (faucet) chain and the helper (volatility) chain.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Testnet,
    Local,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Faucet address must not be zero")]
    ZeroFaucet,

    #[error("Helper address must not be zero")]
    ZeroHelper,

    #[error("Active and helper chain must differ (chain id {0})")]
    SameChain(u64),
}

/// Active chain configuration (where the faucet and user transactions live).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveChainConfig {
    /// Chain ID
    pub chain_id: u64,
    /// Faucet contract address
    pub faucet: Address,
}

impl ActiveChainConfig {
    /// Ethereum Sepolia.
    pub const fn sepolia() -> Self {
        Self {
            chain_id: 11155111,
            faucet: Address::ZERO,
        }
    }

    /// Local anvil node.
    pub const fn local() -> Self {
        Self {
            chain_id: 31337,
            faucet: Address::ZERO,
        }
    }
}

/// Helper chain configuration (where the volatility response is computed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperChainConfig {
    /// Chain ID
    pub chain_id: u64,
    /// Volatility helper contract address
    pub helper: Address,
}

impl HelperChainConfig {
    /// Avalanche Fuji.
    pub const fn fuji() -> Self {
        Self {
            chain_id: 43113,
            helper: Address::ZERO,
        }
    }

    /// Second local anvil node.
    pub const fn local() -> Self {
        Self {
            chain_id: 31338,
            helper: Address::ZERO,
        }
    }
}

/// Complete network configuration for the refill flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network type
    pub network_type: NetworkType,
    /// Faucet chain configuration
    pub active: ActiveChainConfig,
    /// Volatility chain configuration
    pub helper: HelperChainConfig,
}

impl NetworkConfig {
    /// Sepolia faucet with a Fuji helper.
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            active: ActiveChainConfig::sepolia(),
            helper: HelperChainConfig::fuji(),
        }
    }

    /// Two local nodes.
    pub const fn local() -> Self {
        Self {
            network_type: NetworkType::Local,
            active: ActiveChainConfig::local(),
            helper: HelperChainConfig::local(),
        }
    }

    /// Create configuration from network type.
    pub const fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Local => Self::local(),
        }
    }

    /// Check that the contract addresses were filled in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active.faucet == Address::ZERO {
            return Err(ConfigError::ZeroFaucet);
        }

        if self.helper.helper == Address::ZERO {
            return Err(ConfigError::ZeroHelper);
        }

        if self.active.chain_id == self.helper.chain_id {
            return Err(ConfigError::SameChain(self.active.chain_id));
        }

        Ok(())
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    network_type: NetworkType,
    active: ActiveChainConfig,
    helper: HelperChainConfig,
}

impl NetworkConfigBuilder {
    /// Start with testnet defaults.
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            active: ActiveChainConfig::sepolia(),
            helper: HelperChainConfig::fuji(),
        }
    }

    /// Start from a network type's defaults.
    pub const fn from_network_type(network_type: NetworkType) -> Self {
        let NetworkConfig {
            network_type,
            active,
            helper,
        } = NetworkConfig::from_network_type(network_type);
        Self {
            network_type,
            active,
            helper,
        }
    }

    /// Set the faucet address.
    pub const fn faucet(mut self, address: Address) -> Self {
        self.active.faucet = address;
        self
    }

    /// Set the volatility helper address.
    pub const fn helper(mut self, address: Address) -> Self {
        self.helper.helper = address;
        self
    }

    /// Build the network configuration.
    pub const fn build(self) -> NetworkConfig {
        NetworkConfig {
            network_type: self.network_type,
            active: self.active,
            helper: self.helper,
        }
    }
}
