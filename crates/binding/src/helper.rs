//! Volatility helper contract bindings (helper chain).

use alloy_sol_types::sol;

sol! {
    /// VolatilityHelper - answers faucet refill checks with the current volatility score
    #[sol(rpc)]
    interface IVolatilityHelper {
        /// Emitted when the response message is sent back to the faucet chain.
        /// `responseMessageId` is the CCIP id of the response,
        /// `originalMessageId` the id of the request it answers.
        event VolatilityResponseSent(
            bytes32 indexed responseMessageId,
            bytes32 indexed originalMessageId,
            uint256 volatility,
            address faucet
        );
    }
}
