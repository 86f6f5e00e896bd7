//! Evidence extraction for each phase.
//!
//! Pure functions over receipts and logs; the monitor decides what to fetch.

use crate::reader::{LogEntry, ReceiptSummary};
use alloy_primitives::B256;
use binding::{REFILL_TRIGGERED_TOPIC, RESERVOIR_REFILLED_TOPIC, VOLATILITY_RESPONSE_SENT_TOPIC};

/// What the trigger transaction's receipt says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReceipt {
    /// Not mined yet.
    Pending,
    /// Mined, succeeded and emitted `RefillTriggered`.
    Confirmed { message_id: B256 },
    /// Mined and succeeded but no trigger event was emitted.
    MissingEvent,
    /// Mined and reverted.
    Reverted,
}

impl TriggerReceipt {
    pub fn from_receipt(receipt: Option<&ReceiptSummary>) -> Self {
        let Some(receipt) = receipt else {
            return Self::Pending;
        };

        if !receipt.status {
            return Self::Reverted;
        }

        match trigger_message_id(&receipt.logs) {
            Some(message_id) => Self::Confirmed { message_id },
            None => Self::MissingEvent,
        }
    }
}

/// Outbound message id from the first `RefillTriggered` log.
pub fn trigger_message_id(logs: &[LogEntry]) -> Option<B256> {
    logs.iter()
        .find(|log| log.topic(0) == Some(REFILL_TRIGGERED_TOPIC))
        .and_then(|log| log.topic(1))
}

/// Response message id from the newest `VolatilityResponseSent` log that
/// answers `outbound_message_id`.
///
/// Logs whose originating id (`topics[2]`) names another request are stale
/// and skipped; logs without that topic cannot be correlated and are taken
/// as they are.
pub fn response_message_id(logs: &[LogEntry], outbound_message_id: B256) -> Option<B256> {
    logs.iter()
        .rev()
        .filter(|log| log.topic(0) == Some(VOLATILITY_RESPONSE_SENT_TOPIC))
        .filter(|log| log.topic(2).is_none_or(|origin| origin == outbound_message_id))
        .find_map(|log| log.topic(1))
}

/// Whether any `ReservoirRefilled` log is present.
pub fn reservoir_refilled(logs: &[LogEntry]) -> bool {
    logs.iter()
        .any(|log| log.topic(0) == Some(RESERVOIR_REFILLED_TOPIC))
}

/// Inclusive block range covering the last `lookback` blocks.
pub const fn lookback_range(latest: u64, lookback: u64) -> (u64, u64) {
    (latest.saturating_sub(lookback), latest)
}

/// CCIP explorer link for a message.
pub fn ccip_message_url(explorer: &str, message_id: B256) -> String {
    format!("{}/msg/{:#x}", explorer.trim_end_matches('/'), message_id)
}
