//! Refill initiator: submits the trigger transaction and hands it to the monitor.

use crate::{
    error::RefillError,
    monitor::RefillMonitor,
    notify::Notification,
    reader::ChainReader,
};
use action::{Action, Outcome};
use alloy_primitives::TxHash;
use std::sync::Arc;
use store::{Phase, RefillUpdate, Status};
use tracing::{error, info, warn};

/// Result of [`RefillInitiator::initiate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiateOutcome {
    /// Trigger submitted, monitor polling.
    Submitted(TxHash),
    /// A request is already running; nothing was submitted.
    AlreadyRunning,
    /// The last request ended; dismiss it before starting another.
    AwaitingDismissal(Status),
}

pub struct RefillInitiator<A, H, T> {
    monitor: Arc<RefillMonitor<A, H>>,
    trigger: T,
}

impl<A, H, T> RefillInitiator<A, H, T>
where
    A: ChainReader + 'static,
    H: ChainReader + 'static,
    T: Action,
{
    pub const fn new(monitor: Arc<RefillMonitor<A, H>>, trigger: T) -> Self {
        Self { monitor, trigger }
    }

    pub const fn monitor(&self) -> &Arc<RefillMonitor<A, H>> {
        &self.monitor
    }

    /// Start a refill.
    ///
    /// Only an idle request can be initiated; calls while running or before a
    /// terminal state is dismissed change nothing.
    pub async fn initiate(&self) -> Result<InitiateOutcome, RefillError> {
        let store = self.monitor.store();

        let mut blocked = None;
        store.update(|current| match current.status {
            Status::Idle => Some(RefillUpdate::begin()),
            Status::Running => {
                blocked = Some(InitiateOutcome::AlreadyRunning);
                None
            }
            status @ (Status::Success | Status::Failed) => {
                blocked = Some(InitiateOutcome::AwaitingDismissal(status));
                None
            }
        })?;

        if let Some(outcome) = blocked {
            info!(?outcome, "Refill not initiated");
            return Ok(outcome);
        }

        info!(action = %self.trigger.description(), "Initiating refill");

        match self.submit().await {
            Ok(outcome) => {
                let tx_hash = outcome.tx_hash;
                let recorded = store.update(|current| {
                    (current.is_running() && current.initial_tx_hash.is_none())
                        .then(|| RefillUpdate::default().initial_tx_hash(tx_hash))
                });
                if let Err(e) = recorded {
                    // the trigger is on chain; keep the hash somewhere it can be found
                    error!(
                        tx_hash = %tx_hash,
                        block = ?outcome.block_number,
                        error = %e,
                        "Refill trigger included but its hash could not be stored"
                    );
                    return Err(e.into());
                }

                self.monitor.notify(Notification::phase_completed(
                    Phase::RequestClicked,
                    Some(format!("transaction {tx_hash:#x}")),
                ));
                self.monitor.start();

                Ok(InitiateOutcome::Submitted(tx_hash))
            }
            Err(error) => {
                warn!(error = %error, "Refill submission failed");

                self.monitor.stop();
                store.set(RefillUpdate::failed(error.to_string()))?;
                self.monitor.notify(Notification::error(error.to_string()));

                Err(error)
            }
        }
    }

    /// Simulate, then send.
    async fn submit(&self) -> Result<Outcome, RefillError> {
        match self.trigger.is_ready().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(RefillError::Submission(
                    "a refill is already in progress".to_string(),
                ))
            }
            Err(e) => return Err(RefillError::from_submission(&e)),
        }

        self.trigger
            .execute()
            .await
            .map_err(|e| RefillError::from_submission(&e))
    }
}
