pub mod config;
pub mod metrics;

use crate::config::Config;
use action::trigger::{TriggerRefill, TriggerRefillAction};
use monitor::{
    AlloyChainReader, ChainReader, Notifier, RefillInitiator, RefillMonitor,
};
use std::sync::Arc;
use store::{JsonFilePersistence, PhaseStore, RefillRequest};
use tracing::info;

/// Open the persisted refill state named in the config.
pub fn open_store(config: &Config) -> eyre::Result<Arc<PhaseStore>> {
    let store = PhaseStore::open(JsonFilePersistence::new(&config.state_file))?;
    Ok(Arc::new(store))
}

/// Connect to both chains and build the monitor.
pub async fn build_monitor(
    config: &Config,
    store: Arc<PhaseStore>,
    notifier: Arc<dyn Notifier>,
) -> eyre::Result<Arc<RefillMonitor<impl ChainReader + 'static, impl ChainReader + 'static>>> {
    let network = config.network_config()?;

    info!(
        active_chain = network.active.chain_id,
        helper_chain = network.helper.chain_id,
        faucet = %network.active.faucet,
        helper = %network.helper.helper,
        "Connecting to chains"
    );

    let active = client::create_chain_provider(&config.active_rpc_url, network.active.chain_id).await?;
    let helper = client::create_chain_provider(&config.helper_rpc_url, network.helper.chain_id).await?;

    Ok(Arc::new(RefillMonitor::new(
        AlloyChainReader::new(active),
        AlloyChainReader::new(helper),
        store,
        notifier,
        config.monitor_config(),
    )))
}

/// Build the initiator around `monitor`, signing with `private_key`.
pub fn build_initiator<A, H>(
    config: &Config,
    monitor: Arc<RefillMonitor<A, H>>,
    private_key: &str,
) -> eyre::Result<RefillInitiator<A, H, impl action::Action>>
where
    A: ChainReader + 'static,
    H: ChainReader + 'static,
{
    let provider = client::create_wallet_provider(&config.active_rpc_url, private_key)?;
    let trigger = TriggerRefillAction::new(
        provider,
        TriggerRefill {
            faucet: config.faucet_address,
            fee: config.ccip_fee_wei,
        },
    );

    Ok(RefillInitiator::new(monitor, trigger))
}

/// Wait until the request leaves `running`, calling `on_change` for every
/// state the store commits.
pub async fn wait_for_settlement<A, H>(
    monitor: &RefillMonitor<A, H>,
    mut on_change: impl FnMut(&RefillRequest),
) -> RefillRequest
where
    A: ChainReader,
    H: ChainReader,
{
    let mut changes = monitor.subscribe();

    loop {
        let request = changes.borrow_and_update().clone();
        on_change(&request);

        if !request.is_running() {
            return request;
        }

        if changes.changed().await.is_err() {
            return monitor.snapshot();
        }
    }
}
