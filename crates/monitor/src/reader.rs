//! Read access to one chain.
//!
//! The monitor only needs receipts, recent logs and the faucet's progress
//! flag. [`ChainReader`] narrows a provider down to those calls so tests can
//! script chain behaviour.

use alloy_primitives::{Address, TxHash, B256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{Filter, Log};
use async_trait::async_trait;
use binding::faucet::IFaucet;

/// A log reduced to what detection looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub block_number: Option<u64>,
}

impl LogEntry {
    pub fn topic(&self, index: usize) -> Option<B256> {
        self.topics.get(index).copied()
    }
}

impl From<&Log> for LogEntry {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            block_number: log.block_number,
        }
    }
}

/// A transaction receipt reduced to status and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    /// True for a successful execution
    pub status: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<LogEntry>,
}

/// Chain reads used by the refill monitor.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Receipt of `tx_hash`, `None` while the transaction is not mined.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> eyre::Result<Option<ReceiptSummary>>;

    /// Latest block number.
    async fn block_number(&self) -> eyre::Result<u64>;

    /// Logs emitted by `address` in `[from_block, to_block]`.
    async fn logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<LogEntry>>;

    /// The faucet's `refillInProgress()` flag.
    async fn refill_in_progress(&self, faucet: Address) -> eyre::Result<bool>;
}

/// [`ChainReader`] backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct AlloyChainReader<P> {
    provider: P,
}

impl<P> AlloyChainReader<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> ChainReader for AlloyChainReader<P>
where
    P: Provider + Clone + 'static,
{
    async fn transaction_receipt(&self, tx_hash: TxHash) -> eyre::Result<Option<ReceiptSummary>> {
        let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? else {
            return Ok(None);
        };

        Ok(Some(ReceiptSummary {
            status: receipt.status(),
            block_number: receipt.block_number,
            logs: receipt.logs().iter().map(LogEntry::from).collect(),
        }))
    }

    async fn block_number(&self) -> eyre::Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<LogEntry>> {
        let filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self.provider.get_logs(&filter).await?;
        Ok(logs.iter().map(LogEntry::from).collect())
    }

    async fn refill_in_progress(&self, faucet: Address) -> eyre::Result<bool> {
        let contract = IFaucet::new(faucet, &self.provider);
        Ok(contract.refillInProgress().call().await?)
    }
}
