//! Faucet contract bindings (active chain).
//!
//! The faucet dispenses the two faucet tokens from its reservoir and asks the
//! helper chain, over CCIP, how much to pull from the vault when it refills.

use alloy_sol_types::sol;

sol! {
    /// Faucet - dispenses tokens and triggers cross-chain reservoir refills
    #[sol(rpc)]
    interface IFaucet {
        /// Emitted when a refill check is sent to the helper chain.
        /// `messageId` is the outbound CCIP message id.
        event RefillTriggered(bytes32 indexed messageId);

        /// Emitted when the helper chain response is applied and the reservoir refilled
        event ReservoirRefilled(
            address indexed token,
            uint256 amount,
            uint256 reservoirBalance
        );

        /// Reverts when a refill is already waiting for its CCIP response
        error RefillAlreadyInProgress();

        /// Reverts when the vault cannot cover the CCIP fee or the refill
        error InsufficientReserve();

        /// Send a volatility request to the helper chain
        function triggerRefillCheck() external payable;

        /// True between `RefillTriggered` and `ReservoirRefilled`
        function refillInProgress() external view returns (bool);
    }
}
