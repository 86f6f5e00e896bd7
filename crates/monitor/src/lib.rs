//! Cross-chain refill tracking.
//!
//! A refill starts with a trigger transaction on the active chain, crosses to
//! the helper chain over CCIP and comes back with the refill amount. This
//! crate provides:
//! - [`RefillInitiator`]: submits the trigger and starts tracking
//! - [`RefillMonitor`]: polls both chains and advances the request's phases
//! - [`ChainReader`]: the chain reads the monitor depends on
//! - [`Notifier`]: human-readable progress events

pub mod detect;
pub mod error;
pub mod initiator;
pub mod monitor;
pub mod notify;
pub mod reader;

pub use error::RefillError;
pub use initiator::{InitiateOutcome, RefillInitiator};
pub use monitor::{MonitorConfig, RefillMonitor, TickOutcome};
pub use notify::{Level, Notification, Notifier, Notifiers, TracingNotifier};
pub use reader::{AlloyChainReader, ChainReader, LogEntry, ReceiptSummary};
