use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the refill request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Running,
    Success,
    Failed,
}

/// Cross-chain milestones of a refill, in the order they happen.
///
/// Declaration order is the phase order; `Ord` compares ordinals.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    RequestClicked,
    RequestConfirmed,
    OutboundSent,
    OutboundReceived,
    InboundSent,
    InboundReceived,
}

impl Phase {
    /// Progress percentage shown for this phase.
    pub const fn progress(self) -> u8 {
        match self {
            Self::RequestClicked => 0,
            Self::RequestConfirmed => 5,
            Self::OutboundSent => 10,
            Self::OutboundReceived => 45,
            Self::InboundSent => 70,
            Self::InboundReceived => 100,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestClicked => "request_clicked",
            Self::RequestConfirmed => "request_confirmed",
            Self::OutboundSent => "outbound_sent",
            Self::OutboundReceived => "outbound_received",
            Self::InboundSent => "inbound_sent",
            Self::InboundReceived => "inbound_received",
        }
    }

    /// Human-readable milestone description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::RequestClicked => "Refill requested",
            Self::RequestConfirmed => "Refill request confirmed on the faucet chain",
            Self::OutboundSent => "Volatility request sent over CCIP",
            Self::OutboundReceived => "Helper chain answered the volatility request",
            Self::InboundSent => "Volatility response sent over CCIP",
            Self::InboundReceived => "Reservoir refilled",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single in-flight refill request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefillRequest {
    pub status: Status,
    pub current_phase: Phase,
    pub progress: u8,
    /// Hash of the triggering transaction, set once per request
    pub initial_tx_hash: Option<B256>,
    /// CCIP message id from `RefillTriggered`
    pub outbound_message_id: Option<B256>,
    /// CCIP message id from `VolatilityResponseSent`
    pub response_message_id: Option<B256>,
    pub error_message: Option<String>,
}

impl Default for RefillRequest {
    fn default() -> Self {
        Self::idle()
    }
}

impl RefillRequest {
    pub const fn idle() -> Self {
        Self {
            status: Status::Idle,
            current_phase: Phase::RequestClicked,
            progress: 0,
            initial_tx_hash: None,
            outbound_message_id: None,
            response_message_id: None,
            error_message: None,
        }
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.status, Status::Running)
    }

    /// Restore the invariants an older or hand-edited record may break:
    /// idle carries nothing, progress follows the phase.
    pub fn normalize(&mut self) {
        if self.status == Status::Idle {
            *self = Self::idle();
        } else {
            self.progress = self.current_phase.progress();
        }
    }

    /// Apply a partial update. Fields left as `None` keep their value.
    pub fn merge(&mut self, update: RefillUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(phase) = update.current_phase {
            self.current_phase = phase;
            self.progress = phase.progress();
        }
        if let Some(hash) = update.initial_tx_hash {
            self.initial_tx_hash = hash;
        }
        if let Some(id) = update.outbound_message_id {
            self.outbound_message_id = id;
        }
        if let Some(id) = update.response_message_id {
            self.response_message_id = id;
        }
        if let Some(message) = update.error_message {
            self.error_message = message;
        }
    }
}

/// Partial update of a [`RefillRequest`].
///
/// Nullable fields use `Option<Option<_>>`: the outer `None` leaves the field
/// alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefillUpdate {
    pub status: Option<Status>,
    pub current_phase: Option<Phase>,
    pub initial_tx_hash: Option<Option<B256>>,
    pub outbound_message_id: Option<Option<B256>>,
    pub response_message_id: Option<Option<B256>>,
    pub error_message: Option<Option<String>>,
}

impl RefillUpdate {
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub const fn phase(mut self, phase: Phase) -> Self {
        self.current_phase = Some(phase);
        self
    }

    pub const fn initial_tx_hash(mut self, hash: B256) -> Self {
        self.initial_tx_hash = Some(Some(hash));
        self
    }

    pub const fn outbound_message_id(mut self, id: B256) -> Self {
        self.outbound_message_id = Some(Some(id));
        self
    }

    pub const fn response_message_id(mut self, id: B256) -> Self {
        self.response_message_id = Some(Some(id));
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    /// Fresh running request at `request_clicked`.
    pub fn begin() -> Self {
        Self {
            status: Some(Status::Running),
            current_phase: Some(Phase::RequestClicked),
            initial_tx_hash: Some(None),
            outbound_message_id: Some(None),
            response_message_id: Some(None),
            error_message: Some(None),
        }
    }

    /// Terminal failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::default()
            .status(Status::Failed)
            .error_message(message)
    }

    /// The update that turns `from` into `to`, field by field.
    pub fn diff(from: &RefillRequest, to: &RefillRequest) -> Self {
        Self {
            status: (from.status != to.status).then_some(to.status),
            current_phase: (from.current_phase != to.current_phase).then_some(to.current_phase),
            initial_tx_hash: (from.initial_tx_hash != to.initial_tx_hash)
                .then_some(to.initial_tx_hash),
            outbound_message_id: (from.outbound_message_id != to.outbound_message_id)
                .then_some(to.outbound_message_id),
            response_message_id: (from.response_message_id != to.response_message_id)
                .then_some(to.response_message_id),
            error_message: (from.error_message != to.error_message)
                .then(|| to.error_message.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
