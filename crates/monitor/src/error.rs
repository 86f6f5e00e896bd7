use store::StoreError;
use thiserror::Error;

/// Message stored when the signer declines the trigger transaction.
pub const USER_DECLINED_MESSAGE: &str = "Transaction was canceled by the user";

/// Terminal failures of a refill request.
///
/// Chain read failures during polling are not represented here: they are
/// logged and retried on the next tick.
#[derive(Error, Debug)]
pub enum RefillError {
    /// Signer rejected the triggering transaction.
    #[error("Transaction was canceled by the user")]
    UserDeclined,

    /// Simulation or submission failed for another reason.
    #[error("Failed to submit refill request: {0}")]
    Submission(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RefillError {
    /// Classify a simulation or submission error.
    pub fn from_submission(error: &eyre::Report) -> Self {
        let message = format!("{error:#}");
        if is_user_rejection(&message) {
            Self::UserDeclined
        } else {
            Self::Submission(message)
        }
    }
}

/// Wallets word rejections differently; match the common phrasings.
pub fn is_user_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    ["user rejected", "user denied", "rejected the request", "user cancel"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection_is_classified() {
        let error = eyre::eyre!("User rejected the request.");
        let classified = RefillError::from_submission(&error);

        assert!(matches!(classified, RefillError::UserDeclined));
        assert_eq!(classified.to_string(), USER_DECLINED_MESSAGE);
    }

    #[test]
    fn test_wrapped_rejection_is_classified() {
        let error = eyre::eyre!("MetaMask Tx Signature: User denied transaction signature.")
            .wrap_err("send failed");
        assert!(matches!(
            RefillError::from_submission(&error),
            RefillError::UserDeclined
        ));
    }

    #[test]
    fn test_other_errors_are_submission_errors() {
        let error = eyre::eyre!("insufficient funds for gas * price + value");
        let classified = RefillError::from_submission(&error);

        match classified {
            RefillError::Submission(message) => assert!(message.contains("insufficient funds")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
