//! CCIP refill monitor.
//!
//! Follows one refill request across both chains:
//!
//! ```text
//! request_clicked -> request_confirmed -> outbound_sent -> outbound_received
//!                 -> inbound_sent -> inbound_received
//! ```
//!
//! Every tick reads the faucet's `refillInProgress()` flag first, then runs a
//! skip-ahead scan that evaluates each pending phase in order and may advance
//! several phases at once. Results are committed to the [`PhaseStore`] only if
//! the request they were computed for is still the one being tracked.

use crate::{
    detect::{self, TriggerReceipt},
    notify::{Notification, Notifier},
    reader::ChainReader,
};
use alloy_primitives::{Address, TxHash};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};
use store::{Phase, PhaseStore, RefillRequest, RefillUpdate, Status, StoreError};
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Default polling interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Helper-chain blocks searched for the response event.
pub const HELPER_LOOKBACK_BLOCKS: u64 = 100;

/// Active-chain blocks searched for the completion event.
pub const ACTIVE_LOOKBACK_BLOCKS: u64 = 50;

pub const CCIP_EXPLORER_URL: &str = "https://ccip.chain.link";

/// Monitor parameters.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Faucet contract on the active chain
    pub faucet: Address,
    /// Volatility helper contract on the helper chain
    pub helper: Address,
    pub poll_interval: Duration,
    pub helper_lookback_blocks: u64,
    pub active_lookback_blocks: u64,
    /// Base URL of the CCIP explorer
    pub ccip_explorer_url: String,
}

impl MonitorConfig {
    pub fn new(faucet: Address, helper: Address) -> Self {
        Self {
            faucet,
            helper,
            poll_interval: POLL_INTERVAL,
            helper_lookback_blocks: HELPER_LOOKBACK_BLOCKS,
            active_lookback_blocks: ACTIVE_LOOKBACK_BLOCKS,
            ccip_explorer_url: CCIP_EXPLORER_URL.to_string(),
        }
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Result of one polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No request is running.
    NotRunning,
    /// No new evidence.
    Unchanged,
    /// Moved forward, still running.
    Advanced { from: Phase, to: Phase },
    /// Reached `inbound_received`.
    Completed,
    /// The faucet reports no refill in progress; the request was reset to idle.
    FalsePositive,
    /// Polling was stopped or the request changed while the tick ran.
    Discarded,
}

impl TickOutcome {
    /// Whether the poller should keep ticking after this outcome.
    pub const fn keeps_polling(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Advanced { .. })
    }
}

#[derive(Debug, Default)]
struct Cancellation {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct PollHandle {
    cancel: Arc<Cancellation>,
    task: JoinHandle<()>,
}

/// A phase advance found by the scan.
struct Advance {
    phase: Phase,
    update: RefillUpdate,
    detail: Option<String>,
}

/// What one skip-ahead scan found.
struct Scan {
    request: RefillRequest,
    advanced: Vec<(Phase, Option<String>)>,
    read_failed: bool,
}

/// Tracks the refill request and drives it through its phases.
pub struct RefillMonitor<A, H> {
    active: A,
    helper: H,
    store: Arc<PhaseStore>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
    poller: Mutex<Option<PollHandle>>,
    read_failures: AtomicU32,
}

impl<A, H> RefillMonitor<A, H>
where
    A: ChainReader,
    H: ChainReader,
{
    pub fn new(
        active: A,
        helper: H,
        store: Arc<PhaseStore>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            active,
            helper,
            store,
            notifier,
            config,
            poller: Mutex::new(None),
            read_failures: AtomicU32::new(0),
        }
    }

    /// Read-only snapshot of the request.
    pub fn snapshot(&self) -> RefillRequest {
        self.store.get()
    }

    /// Follow state changes.
    pub fn subscribe(&self) -> watch::Receiver<RefillRequest> {
        self.store.subscribe()
    }

    pub const fn store(&self) -> &Arc<PhaseStore> {
        &self.store
    }

    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(&notification);
    }

    /// Whether a poll task is active.
    pub fn is_polling(&self) -> bool {
        self.lock_poller()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Stop polling. Returns false when nothing was polling.
    ///
    /// A tick already in flight finishes its chain calls but does not commit.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.lock_poller().take() else {
            return false;
        };

        handle.cancel.cancel();
        let was_running = !handle.task.is_finished();
        if was_running {
            debug!("Refill polling stop requested");
        }
        was_running
    }

    /// Explicit dismiss: stop polling and return the store to idle.
    pub fn reset_to_idle(&self) -> Result<RefillRequest, StoreError> {
        self.stop();
        let request = self.store.reset()?;
        info!("Refill state reset to idle");
        Ok(request)
    }

    /// Run one tick outside the poll loop.
    pub async fn tick(&self) -> TickOutcome {
        self.run_tick(None).await
    }

    async fn run_tick(&self, cancel: Option<&Cancellation>) -> TickOutcome {
        let snapshot = self.store.get();
        if !snapshot.is_running() {
            return TickOutcome::NotRunning;
        }

        let Some(tx_hash) = snapshot.initial_tx_hash else {
            debug!("Refill submission still pending, nothing to track yet");
            return TickOutcome::Unchanged;
        };

        let in_progress = match self.active.refill_in_progress(self.config.faucet).await {
            Ok(flag) => Some(flag),
            Err(e) => {
                warn!(faucet = %self.config.faucet, error = %e, "Failed to read refill flag");
                None
            }
        };

        let scan = self.scan(&snapshot, tx_hash, in_progress).await;
        self.record_read_health(scan.read_failed || in_progress.is_none());

        if cancel.is_some_and(Cancellation::is_cancelled) {
            debug!("Polling stopped during tick, discarding results");
            return TickOutcome::Discarded;
        }

        let completed = scan.request.current_phase == Phase::InboundReceived;

        // completion wins: the flag clears as soon as the refill is applied
        if !completed && in_progress == Some(false) {
            return self.reconcile(&snapshot, cancel);
        }

        if scan.request == snapshot {
            return TickOutcome::Unchanged;
        }

        self.commit(&snapshot, scan, cancel)
    }

    /// Evaluate every pending phase in order, advancing as far as the evidence
    /// allows.
    async fn scan(
        &self,
        snapshot: &RefillRequest,
        tx_hash: TxHash,
        in_progress: Option<bool>,
    ) -> Scan {
        let mut scan = Scan {
            request: snapshot.clone(),
            advanced: Vec::new(),
            read_failed: false,
        };

        loop {
            let phase = scan.request.current_phase;
            let step = match phase {
                Phase::RequestClicked => self.detect_request_confirmed(tx_hash, in_progress).await,
                Phase::RequestConfirmed => Ok(self.outbound_sent(&scan.request)),
                Phase::OutboundSent => self.detect_outbound_received(&scan.request).await,
                Phase::OutboundReceived => Ok(self.inbound_sent(&scan.request)),
                Phase::InboundSent => self.detect_inbound_received().await,
                Phase::InboundReceived => break,
            };

            let advance = match step {
                Ok(Some(advance)) => advance,
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        phase = %phase,
                        tx_hash = %tx_hash,
                        error = %e,
                        "Chain read failed, will retry next tick"
                    );
                    scan.read_failed = true;
                    break;
                }
            };

            debug_assert!(advance.phase > phase);
            scan.request.merge(advance.update);
            scan.advanced.push((advance.phase, advance.detail));

            // the inbound leg starts on the next tick
            if advance.phase == Phase::OutboundReceived {
                break;
            }
        }

        scan
    }

    async fn detect_request_confirmed(
        &self,
        tx_hash: TxHash,
        in_progress: Option<bool>,
    ) -> eyre::Result<Option<Advance>> {
        let receipt = self.active.transaction_receipt(tx_hash).await?;

        match TriggerReceipt::from_receipt(receipt.as_ref()) {
            TriggerReceipt::Pending => {
                debug!(tx_hash = %tx_hash, "Trigger transaction not mined yet");
                Ok(None)
            }
            TriggerReceipt::Confirmed { message_id } => Ok(Some(Advance {
                phase: Phase::RequestConfirmed,
                update: RefillUpdate::default()
                    .phase(Phase::RequestConfirmed)
                    .outbound_message_id(message_id),
                detail: Some(format!("message {message_id:#x}")),
            })),
            TriggerReceipt::MissingEvent => {
                warn!(tx_hash = %tx_hash, "Trigger transaction emitted no RefillTriggered event");
                Ok(None)
            }
            TriggerReceipt::Reverted => {
                let reason = match in_progress {
                    Some(true) => "a refill is already in progress",
                    Some(false) => "the faucet reserve is likely insufficient",
                    None => "unknown",
                };
                warn!(tx_hash = %tx_hash, reason, "Trigger transaction reverted");
                Ok(None)
            }
        }
    }

    fn outbound_sent(&self, request: &RefillRequest) -> Option<Advance> {
        let message_id = request.outbound_message_id?;
        let url = detect::ccip_message_url(&self.config.ccip_explorer_url, message_id);

        Some(Advance {
            phase: Phase::OutboundSent,
            update: RefillUpdate::default().phase(Phase::OutboundSent),
            detail: Some(url),
        })
    }

    async fn detect_outbound_received(
        &self,
        request: &RefillRequest,
    ) -> eyre::Result<Option<Advance>> {
        let Some(outbound_message_id) = request.outbound_message_id else {
            return Ok(None);
        };

        let latest = self.helper.block_number().await?;
        let (from_block, to_block) =
            detect::lookback_range(latest, self.config.helper_lookback_blocks);

        debug!(
            helper = %self.config.helper,
            from = from_block,
            to = to_block,
            "Scanning helper chain for volatility response"
        );

        let logs = self
            .helper
            .logs(self.config.helper, from_block, to_block)
            .await?;

        Ok(
            detect::response_message_id(&logs, outbound_message_id).map(|response_id| Advance {
                phase: Phase::OutboundReceived,
                update: RefillUpdate::default()
                    .phase(Phase::OutboundReceived)
                    .response_message_id(response_id),
                detail: Some(format!("response {response_id:#x}")),
            }),
        )
    }

    fn inbound_sent(&self, request: &RefillRequest) -> Option<Advance> {
        let message_id = request.response_message_id?;
        let url = detect::ccip_message_url(&self.config.ccip_explorer_url, message_id);

        Some(Advance {
            phase: Phase::InboundSent,
            update: RefillUpdate::default().phase(Phase::InboundSent),
            detail: Some(url),
        })
    }

    async fn detect_inbound_received(&self) -> eyre::Result<Option<Advance>> {
        let latest = self.active.block_number().await?;
        let (from_block, to_block) =
            detect::lookback_range(latest, self.config.active_lookback_blocks);

        debug!(
            faucet = %self.config.faucet,
            from = from_block,
            to = to_block,
            "Scanning faucet chain for reservoir refill"
        );

        let logs = self
            .active
            .logs(self.config.faucet, from_block, to_block)
            .await?;

        Ok(detect::reservoir_refilled(&logs).then(|| Advance {
            phase: Phase::InboundReceived,
            update: RefillUpdate::default()
                .phase(Phase::InboundReceived)
                .status(Status::Success),
            detail: None,
        }))
    }

    /// Replace stale local progress with the chain's answer.
    fn reconcile(&self, snapshot: &RefillRequest, cancel: Option<&Cancellation>) -> TickOutcome {
        let result = self
            .store
            .reset_if(|current| Self::still_tracking(current, snapshot, cancel));

        match result {
            Ok(Some(_)) => {
                info!(
                    phase = %snapshot.current_phase,
                    tx_hash = ?snapshot.initial_tx_hash,
                    "Faucet reports no refill in progress, resetting local state"
                );
                self.notify(Notification::info(
                    "No refill in progress on the faucet, ready for a new request",
                ));
                TickOutcome::FalsePositive
            }
            Ok(None) => TickOutcome::Discarded,
            Err(e) => {
                error!(error = %e, "Failed to persist refill reset");
                TickOutcome::Unchanged
            }
        }
    }

    fn commit(
        &self,
        snapshot: &RefillRequest,
        scan: Scan,
        cancel: Option<&Cancellation>,
    ) -> TickOutcome {
        let next = scan.request;
        let result = self.store.update(|current| {
            // never move backwards, even when replayed evidence is older
            if !Self::still_tracking(current, snapshot, cancel)
                || next.current_phase <= current.current_phase
            {
                return None;
            }
            Some(RefillUpdate::diff(current, &next))
        });

        match result {
            Ok(Some(committed)) => {
                info!(
                    from = %snapshot.current_phase,
                    to = %committed.current_phase,
                    progress = committed.progress,
                    "Refill advanced"
                );

                for (phase, detail) in scan.advanced {
                    if phase == Phase::InboundReceived {
                        continue;
                    }
                    self.notify(Notification::phase_completed(phase, detail));
                }

                if committed.status == Status::Success {
                    self.notify(Notification::success(
                        "Reservoir refilled, the faucet is ready to dispense",
                    ));
                    TickOutcome::Completed
                } else {
                    TickOutcome::Advanced {
                        from: snapshot.current_phase,
                        to: committed.current_phase,
                    }
                }
            }
            Ok(None) => TickOutcome::Discarded,
            Err(e) => {
                error!(error = %e, "Failed to persist refill progress");
                TickOutcome::Unchanged
            }
        }
    }

    fn still_tracking(
        current: &RefillRequest,
        snapshot: &RefillRequest,
        cancel: Option<&Cancellation>,
    ) -> bool {
        !cancel.is_some_and(Cancellation::is_cancelled)
            && current.is_running()
            && current.initial_tx_hash == snapshot.initial_tx_hash
    }

    fn record_read_health(&self, failed: bool) {
        if failed {
            let failures = self.read_failures.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(consecutive_read_failures = failures, "Tick finished with read failures");
        } else {
            self.read_failures.store(0, Ordering::Relaxed);
        }
    }

    /// Consecutive ticks that hit a chain read failure.
    pub fn consecutive_read_failures(&self) -> u32 {
        self.read_failures.load(Ordering::Relaxed)
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<PollHandle>> {
        self.poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<A, H> RefillMonitor<A, H>
where
    A: ChainReader + 'static,
    H: ChainReader + 'static,
{
    /// Start the poll task. Returns false when one is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut poller = self.lock_poller();
        if poller
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
        {
            debug!("Refill polling already running");
            return false;
        }

        let cancel = Arc::new(Cancellation::default());
        let monitor = Arc::clone(self);
        let token = Arc::clone(&cancel);
        let task = tokio::spawn(async move { monitor.poll(token).await });

        *poller = Some(PollHandle { cancel, task });
        true
    }

    async fn poll(&self, cancel: Arc<Cancellation>) {
        let period = self.config.poll_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "Refill polling started");

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel.notify.notified() => {}
            }

            if cancel.is_cancelled() {
                break;
            }

            let outcome = self.run_tick(Some(&cancel)).await;
            debug!(?outcome, "Refill tick finished");

            if !outcome.keeps_polling() {
                break;
            }
        }

        debug!("Refill polling stopped");
    }

    /// Pick up a request that was running before a restart.
    ///
    /// Runs one tick right away (reconciliation first) and keeps polling if
    /// the request is still running afterwards.
    pub async fn resume(self: &Arc<Self>) -> TickOutcome {
        let snapshot = self.store.get();
        if !snapshot.is_running() {
            return TickOutcome::NotRunning;
        }

        if snapshot.initial_tx_hash.is_none() {
            warn!("Persisted refill has no transaction hash, resetting");
            return match self.store.reset() {
                Ok(_) => TickOutcome::FalsePositive,
                Err(e) => {
                    error!(error = %e, "Failed to reset untrackable refill");
                    TickOutcome::Unchanged
                }
            };
        }

        info!(
            phase = %snapshot.current_phase,
            tx_hash = ?snapshot.initial_tx_hash,
            "Resuming refill tracking"
        );

        let outcome = self.tick().await;
        if outcome.keeps_polling() {
            self.start();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{notify::TracingNotifier, reader::LogEntry, reader::ReceiptSummary};
    use alloy_primitives::B256;
    use async_trait::async_trait;
    use binding::REFILL_TRIGGERED_TOPIC;

    /// Faucet with a mined trigger and nothing else.
    struct QuietChain {
        in_progress: bool,
    }

    #[async_trait]
    impl ChainReader for QuietChain {
        async fn transaction_receipt(
            &self,
            _tx_hash: TxHash,
        ) -> eyre::Result<Option<ReceiptSummary>> {
            Ok(Some(ReceiptSummary {
                status: true,
                block_number: Some(1),
                logs: vec![LogEntry {
                    address: Address::repeat_byte(0xfa),
                    topics: vec![REFILL_TRIGGERED_TOPIC, B256::repeat_byte(0x11)],
                    block_number: Some(1),
                }],
            }))
        }

        async fn block_number(&self) -> eyre::Result<u64> {
            Ok(10)
        }

        async fn logs(&self, _: Address, _: u64, _: u64) -> eyre::Result<Vec<LogEntry>> {
            Ok(vec![])
        }

        async fn refill_in_progress(&self, _faucet: Address) -> eyre::Result<bool> {
            Ok(self.in_progress)
        }
    }

    fn monitor(in_progress: bool) -> Arc<RefillMonitor<QuietChain, QuietChain>> {
        let store = Arc::new(PhaseStore::in_memory());
        store
            .set(RefillUpdate::begin().initial_tx_hash(B256::repeat_byte(0xaa)))
            .unwrap();

        Arc::new(RefillMonitor::new(
            QuietChain { in_progress },
            QuietChain { in_progress },
            store,
            Arc::new(TracingNotifier),
            MonitorConfig::new(Address::repeat_byte(0xfa), Address::repeat_byte(0xbe)),
        ))
    }

    #[test]
    fn test_keeps_polling() {
        assert!(TickOutcome::Unchanged.keeps_polling());
        assert!(TickOutcome::Advanced {
            from: Phase::RequestClicked,
            to: Phase::OutboundSent
        }
        .keeps_polling());
        assert!(!TickOutcome::Completed.keeps_polling());
        assert!(!TickOutcome::FalsePositive.keeps_polling());
        assert!(!TickOutcome::Discarded.keeps_polling());
    }

    #[tokio::test]
    async fn test_tick_advances_through_bookkeeping() {
        let monitor = monitor(true);
        let outcome = monitor.tick().await;

        assert_eq!(
            outcome,
            TickOutcome::Advanced {
                from: Phase::RequestClicked,
                to: Phase::OutboundSent
            }
        );
        assert_eq!(monitor.snapshot().progress, 10);
    }

    #[tokio::test]
    async fn test_cancelled_tick_does_not_commit() {
        let monitor = monitor(true);
        let cancel = Cancellation::default();
        cancel.cancel();

        assert_eq!(monitor.run_tick(Some(&cancel)).await, TickOutcome::Discarded);
        assert_eq!(monitor.snapshot().current_phase, Phase::RequestClicked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let monitor = monitor(true);

        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(monitor.is_polling());

        assert!(monitor.stop());
        assert!(!monitor.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_ticks_on_interval() {
        let monitor = monitor(true);
        let mut changes = monitor.subscribe();

        assert!(monitor.start());
        // paused clock auto-advances to the first interval
        changes.changed().await.unwrap();

        assert_eq!(monitor.snapshot().current_phase, Phase::OutboundSent);
        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_exits_after_false_positive() {
        let monitor = monitor(false);
        let mut changes = monitor.subscribe();

        assert!(monitor.start());
        changes.changed().await.unwrap();
        assert_eq!(monitor.snapshot(), RefillRequest::idle());

        // let the task observe the outcome and finish
        time::sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert!(!monitor.is_polling());
    }
}
