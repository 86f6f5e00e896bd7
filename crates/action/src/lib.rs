pub mod trigger;

use alloy_primitives::TxHash;
use std::future::Future;

/// Trait for executable onchain actions.
pub trait Action: Send + Sync {
    /// Simulate the action against current chain state.
    ///
    /// Returns false when a precondition read says the action would be
    /// rejected, and an error when the simulated call reverts.
    fn is_ready(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Submit the action and wait for its inclusion.
    ///
    /// A reverted transaction is an error.
    fn execute(&self) -> impl Future<Output = eyre::Result<Outcome>> + Send;

    /// Get a human-readable description of this action.
    fn description(&self) -> String;
}

/// Outcome of a submitted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
}
