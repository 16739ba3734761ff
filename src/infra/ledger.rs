//! Payment seam: a value transfer to an exchange's deposit address.

use crate::crypto::identity::Identity;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid recipient address {address:?}: {reason}")]
    InvalidRecipient { address: String, reason: String },

    #[error("transfer submission failed: {0}")]
    Submission(String),

    #[error("transaction {digest} did not settle: {reason}")]
    Settlement { digest: String, reason: String },
}

/// Submits transfers signed by an identity and waits for settlement.
///
/// Implementations must not retry a submission on their own: a retried
/// transfer that did land would pay twice.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Transfers `amount` base units from `payer` to `recipient` and returns
    /// the transaction digest once it is final.
    async fn transfer(
        &self,
        payer: &Identity,
        recipient: &str,
        amount: u64,
    ) -> Result<String, LedgerError>;
}
