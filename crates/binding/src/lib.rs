//! Contract bindings for the refill flow.
//!
//! - Faucet (active chain): trigger, progress flag, completion event
//! - VolatilityHelper (helper chain): response event
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod faucet;
pub mod helper;

use alloy_primitives::B256;
use alloy_sol_types::SolEvent;

/// `topics[0]` of `RefillTriggered(bytes32)`.
pub const REFILL_TRIGGERED_TOPIC: B256 = faucet::IFaucet::RefillTriggered::SIGNATURE_HASH;

/// `topics[0]` of `VolatilityResponseSent(bytes32,bytes32,uint256,address)`.
///
/// Assumes the deployed helper indexes `responseMessageId` then
/// `originalMessageId`: detection reads the response id from `topics[1]` and
/// drops logs whose `topics[2]` names another request. A helper indexing a
/// different second field would have every response rejected.
pub const VOLATILITY_RESPONSE_SENT_TOPIC: B256 =
    helper::IVolatilityHelper::VolatilityResponseSent::SIGNATURE_HASH;

/// `topics[0]` of `ReservoirRefilled(address,uint256,uint256)`.
pub const RESERVOIR_REFILLED_TOPIC: B256 = faucet::IFaucet::ReservoirRefilled::SIGNATURE_HASH;
