//! RPC connections to the active and helper chains.

use alloy_network::EthereumWallet;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error connecting to the RPC endpoint
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Endpoint serves a different chain than configured
    #[error("Chain id mismatch: expected {expected}, endpoint reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Convenience function to create an ethereum rpc provider from url.
pub async fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider)
}

/// Create a read-only provider and check that it serves `chain_id`.
pub async fn create_chain_provider(
    rpc_url: &str,
    chain_id: u64,
) -> Result<impl Provider + Clone, ClientError> {
    let provider = create_provider(rpc_url).await?;
    ensure_chain_id(&provider, chain_id).await?;

    Ok(provider)
}

/// Create a provider with wallet signing capability from a private key.
pub fn create_wallet_provider(
    rpc_url: &str,
    private_key: &str,
) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;

    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))?;

    let wallet = EthereumWallet::from(signer);

    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

    Ok(provider)
}

/// Fail unless the provider reports `expected` as its chain id.
pub async fn ensure_chain_id<P>(provider: &P, expected: u64) -> Result<(), ClientError>
where
    P: Provider,
{
    let actual = provider
        .get_chain_id()
        .await
        .map_err(|e| ClientError::Connection(format!("{}", e)))?;

    if actual != expected {
        return Err(ClientError::ChainMismatch { expected, actual });
    }

    Ok(())
}
