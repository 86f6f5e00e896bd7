//! Phase state store for the cross-chain refill request.
//!
//! Holds the single [`RefillRequest`], applies shallow-merge updates, persists
//! every change through a [`Persistence`] backend and broadcasts snapshots to
//! subscribers. There is no polling logic here.

pub mod persistence;
pub mod types;

pub use persistence::{JsonFilePersistence, MemoryPersistence, Persistence, STORE_KEY};
pub use types::{Phase, RefillRequest, RefillUpdate, Status};

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Corrupt persisted state: {0}")]
    Corrupt(String),
}

/// Container for the refill request.
///
/// Construct one per process and share it (`Arc`) between the monitor, the
/// initiator and whatever renders the state.
pub struct PhaseStore {
    state: watch::Sender<RefillRequest>,
    persistence: Box<dyn Persistence>,
}

impl PhaseStore {
    /// Restore the persisted request (or idle defaults) and wrap it.
    pub fn open(persistence: impl Persistence + 'static) -> Result<Self, StoreError> {
        let mut request = persistence.load()?.unwrap_or_default();
        request.normalize();

        debug!(
            status = ?request.status,
            phase = %request.current_phase,
            "Restored refill state"
        );

        let (state, _) = watch::channel(request);
        Ok(Self {
            state,
            persistence: Box::new(persistence),
        })
    }

    /// Store backed by memory only.
    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(RefillRequest::idle());
        Self {
            state,
            persistence: Box::new(MemoryPersistence::new()),
        }
    }

    /// Snapshot of the current request.
    pub fn get(&self) -> RefillRequest {
        self.state.borrow().clone()
    }

    /// Receiver that observes every committed change.
    pub fn subscribe(&self) -> watch::Receiver<RefillRequest> {
        self.state.subscribe()
    }

    /// Shallow-merge `update` into the request.
    pub fn set(&self, update: RefillUpdate) -> Result<RefillRequest, StoreError> {
        let committed = self.update(|_| Some(update))?;
        Ok(committed.unwrap_or_else(|| self.get()))
    }

    /// Return to idle defaults.
    pub fn reset(&self) -> Result<RefillRequest, StoreError> {
        let committed = self.reset_if(|_| true)?;
        Ok(committed.unwrap_or_else(RefillRequest::idle))
    }

    /// Return to idle defaults when `f` accepts the current request.
    ///
    /// `f` runs under the store lock. Returns the idle request when the reset
    /// happened.
    pub fn reset_if<F>(&self, f: F) -> Result<Option<RefillRequest>, StoreError>
    where
        F: FnOnce(&RefillRequest) -> bool,
    {
        self.replace(|current| f(current).then(RefillRequest::idle))
    }

    /// Atomically derive an update from the current request.
    ///
    /// `f` runs under the store lock; returning `None` leaves the request
    /// untouched. Returns the resulting request when `f` produced an update.
    pub fn update<F>(&self, f: F) -> Result<Option<RefillRequest>, StoreError>
    where
        F: FnOnce(&RefillRequest) -> Option<RefillUpdate>,
    {
        self.replace(|current| {
            f(current).map(|update| {
                let mut next = current.clone();
                next.merge(update);
                next
            })
        })
    }

    fn replace<F>(&self, f: F) -> Result<Option<RefillRequest>, StoreError>
    where
        F: FnOnce(&RefillRequest) -> Option<RefillRequest>,
    {
        let mut result = Ok(None);

        self.state.send_if_modified(|current| {
            let Some(next) = f(current) else {
                return false;
            };

            if next == *current {
                result = Ok(Some(next));
                return false;
            }

            // persist first, memory only changes once storage agrees
            match self.persistence.save(&next) {
                Ok(()) => {
                    debug!(
                        status = ?next.status,
                        phase = %next.current_phase,
                        progress = next.progress,
                        "Refill state committed"
                    );
                    *current = next.clone();
                    result = Ok(Some(next));
                    true
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use serde_json::json;
    use std::sync::Arc;

    /// Shares one document between store instances to mimic a reload.
    struct Shared(Arc<MemoryPersistence>);

    impl Persistence for Shared {
        fn load(&self) -> Result<Option<RefillRequest>, StoreError> {
            self.0.load()
        }

        fn save(&self, request: &RefillRequest) -> Result<(), StoreError> {
            self.0.save(request)
        }
    }

    struct FailingPersistence;

    impl Persistence for FailingPersistence {
        fn load(&self) -> Result<Option<RefillRequest>, StoreError> {
            Ok(None)
        }

        fn save(&self, _request: &RefillRequest) -> Result<(), StoreError> {
            Err(StoreError::Corrupt("disk full".into()))
        }
    }

    #[test]
    fn test_set_merges_fields() {
        let store = PhaseStore::in_memory();
        store.set(RefillUpdate::begin()).unwrap();
        store
            .set(RefillUpdate::default().initial_tx_hash(B256::repeat_byte(0xaa)))
            .unwrap();
        let request = store
            .set(RefillUpdate::default().phase(Phase::RequestConfirmed))
            .unwrap();

        assert_eq!(request.status, Status::Running);
        assert_eq!(request.progress, 5);
        assert_eq!(request.initial_tx_hash, Some(B256::repeat_byte(0xaa)));
    }

    #[test]
    fn test_reset_returns_idle_defaults() {
        let store = PhaseStore::in_memory();
        store
            .set(
                RefillUpdate::begin()
                    .phase(Phase::InboundSent)
                    .initial_tx_hash(B256::repeat_byte(0xaa))
                    .outbound_message_id(B256::repeat_byte(0x11))
                    .response_message_id(B256::repeat_byte(0x22)),
            )
            .unwrap();

        store.reset().unwrap();
        assert_eq!(store.get(), RefillRequest::idle());
    }

    #[test]
    fn test_update_skips_when_closure_declines() {
        let store = PhaseStore::in_memory();
        let result = store.update(|_| None).unwrap();
        assert!(result.is_none());
        assert_eq!(store.get(), RefillRequest::idle());
    }

    #[test]
    fn test_reopen_restores_verbatim() {
        let document = Arc::new(MemoryPersistence::with_document(json!({
            STORE_KEY: { "volatility": 7 }
        })));

        let store = PhaseStore::open(Shared(document.clone())).unwrap();
        store
            .set(
                RefillUpdate::begin()
                    .phase(Phase::OutboundSent)
                    .initial_tx_hash(B256::repeat_byte(0xaa))
                    .outbound_message_id(B256::repeat_byte(0x11)),
            )
            .unwrap();
        let before = store.get();
        drop(store);

        let reopened = PhaseStore::open(Shared(document.clone())).unwrap();
        assert_eq!(reopened.get(), before);
        assert_eq!(document.document()[STORE_KEY]["volatility"], 7);
    }

    #[test]
    fn test_open_derives_progress_from_phase() {
        let document = MemoryPersistence::with_document(json!({
            STORE_KEY: {
                "status": "running",
                "currentPhase": "outbound_sent",
                "initialTxHash": B256::repeat_byte(0xaa),
            }
        }));

        let store = PhaseStore::open(document).unwrap();
        assert_eq!(store.get().progress, 10);
    }

    #[test]
    fn test_reset_clears_inconsistent_progress() {
        let document = MemoryPersistence::with_document(json!({
            STORE_KEY: {
                "status": "running",
                "currentPhase": "request_clicked",
                "progress": 37,
                "initialTxHash": B256::repeat_byte(0xaa),
            }
        }));

        let store = PhaseStore::open(document).unwrap();
        assert_eq!(store.get().progress, 0);

        store.reset().unwrap();
        assert_eq!(store.get(), RefillRequest::idle());
    }

    #[test]
    fn test_reset_if_declines() {
        let store = PhaseStore::in_memory();
        store.set(RefillUpdate::begin()).unwrap();

        assert!(store.reset_if(|current| !current.is_running()).unwrap().is_none());
        assert_eq!(store.get().status, Status::Running);

        assert_eq!(
            store.reset_if(RefillRequest::is_running).unwrap(),
            Some(RefillRequest::idle())
        );
    }

    #[test]
    fn test_failed_save_leaves_memory_untouched() {
        let store = PhaseStore::open(FailingPersistence).unwrap();
        let result = store.set(RefillUpdate::begin());

        assert!(matches!(result, Err(StoreError::Corrupt(_))));
        assert_eq!(store.get(), RefillRequest::idle());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = PhaseStore::in_memory();
        let mut receiver = store.subscribe();
        assert!(!receiver.has_changed().unwrap());

        store.set(RefillUpdate::begin()).unwrap();
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().status, Status::Running);

        // no-op writes are not broadcast
        store.set(RefillUpdate::default().status(Status::Running)).unwrap();
        assert!(!receiver.has_changed().unwrap());
    }
}
