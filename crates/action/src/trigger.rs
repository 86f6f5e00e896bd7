use crate::{Action, Outcome};
use alloy_primitives::{utils::format_ether, Address, U256};
use alloy_provider::Provider;
use binding::faucet::IFaucet;
use tracing::{debug, info};

/// Input for the refill trigger.
#[derive(Debug, Clone)]
pub struct TriggerRefill {
    /// Faucet contract address on the active chain
    pub faucet: Address,
    /// Native value attached to pay the CCIP fee, zero when the faucet pays
    pub fee: U256,
}

/// Sends `triggerRefillCheck()` to the faucet.
pub struct TriggerRefillAction<P> {
    provider: P,
    trigger: TriggerRefill,
}

impl<P> TriggerRefillAction<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P, trigger: TriggerRefill) -> Self {
        Self { provider, trigger }
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.trigger.faucet == Address::ZERO {
            eyre::bail!("Faucet must not be zero");
        }

        Ok(())
    }
}

impl<P> Action for TriggerRefillAction<P>
where
    P: Provider + Clone,
{
    async fn is_ready(&self) -> eyre::Result<bool> {
        self.validate()?;

        let contract = IFaucet::new(self.trigger.faucet, &self.provider);
        if contract.refillInProgress().call().await? {
            debug!(faucet = %self.trigger.faucet, "Refill already in progress");
            return Ok(false);
        }

        // reverts surface here as errors
        contract
            .triggerRefillCheck()
            .value(self.trigger.fee)
            .call()
            .await?;

        Ok(true)
    }

    async fn execute(&self) -> eyre::Result<Outcome> {
        self.validate()?;

        let contract = IFaucet::new(self.trigger.faucet, &self.provider);
        let pending = contract
            .triggerRefillCheck()
            .value(self.trigger.fee)
            .send()
            .await?;

        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, "Refill trigger sent, waiting for inclusion");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            eyre::bail!("Refill trigger transaction {tx_hash} reverted");
        }

        info!(
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            faucet = %self.trigger.faucet,
            "Refill trigger included."
        );

        Ok(Outcome {
            tx_hash,
            block_number: receipt.block_number,
        })
    }

    fn description(&self) -> String {
        if self.trigger.fee.is_zero() {
            format!("Trigger reservoir refill on faucet {}", self.trigger.faucet)
        } else {
            format!(
                "Trigger reservoir refill on faucet {} paying {} ETH CCIP fee",
                self.trigger.faucet,
                format_ether(self.trigger.fee)
            )
        }
    }
}
