//! Configuration types for the faucet refill system.
//!
//! This crate provides:
//! - Network configurations (testnet, local)
//! - Chain ids and contract addresses for both chains
//! - Configuration validation

pub mod network;

pub use network::{
    ActiveChainConfig, ConfigError, HelperChainConfig, NetworkConfig, NetworkConfigBuilder,
    NetworkType,
};
