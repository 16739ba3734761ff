//! Error types for pkv-client.

use crate::domain::model::PaymentEnvironment;
use crate::infra::ledger::LedgerError;
use crate::transport::RpcError;
use cid::Cid;
use thiserror::Error;
use tracing::debug;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the exchange, retrieval and publish flows.
#[derive(Error, Debug)]
pub enum Error {
    /// Login failed because the account does not exist yet.
    #[error("no exchange account registered at {endpoint}")]
    NotRegistered { endpoint: String },

    /// The deposit `digest` settled but no usable login came of it.
    #[error("registration at {endpoint} failed after deposit {digest}: {reason}")]
    RegistrationFailed {
        endpoint: String,
        digest: String,
        reason: String,
    },

    /// A session that already failed was asked to authenticate again.
    #[error("exchange session for {endpoint} has failed")]
    SessionFailed { endpoint: String },

    /// A peer answered, but a required field was absent or empty.
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    /// Every candidate was tried without producing a usable credential or value.
    /// Only recoverable failures are ever counted here.
    #[error(
        "exhausted all candidates for {what} after {attempts} attempt(s); last error: {}",
        .last_error.as_deref().unwrap_or("none")
    )]
    Exhausted {
        what: String,
        attempts: usize,
        last_error: Option<String>,
    },

    /// Payment submission or settlement failed. Never retried.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Remote procedure call failure.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The exchange does not accept payment on the configured environment.
    #[error("exchange {endpoint} has no payment method for {environment}")]
    NoPaymentMethod {
        endpoint: String,
        environment: PaymentEnvironment,
    },

    /// A string could not be parsed as a content identifier.
    #[error("invalid CID {input:?}: {source}")]
    InvalidCid {
        input: String,
        #[source]
        source: cid::Error,
    },

    /// A network address could not be turned into an HTTP endpoint.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// A bundle identifier needs at least one CID.
    #[error("cannot compute a bundle identifier for an empty CID list")]
    EmptyBundle,

    /// The block is not resident in the local store.
    #[error("block {0} is not in the local block store")]
    BlockNotFound(Cid),

    /// The codec is neither raw nor dag-pb.
    #[error("unsupported codec 0x{0:x}")]
    UnsupportedCodec(u64),

    /// Block encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Identity derivation failed.
    #[error("identity derivation failed: {0}")]
    Identity(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Signature encoding or verification failed.
    #[error("signature error: {0}")]
    Signature(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        Error::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_cid(input: &str, source: cid::Error) -> Self {
        Error::InvalidCid {
            input: input.to_string(),
            source,
        }
    }

    /// Whether a fallback loop must stop on this error instead of moving on
    /// to the next candidate.
    ///
    /// Only "nobody usable answered" failures are recoverable: unreachable
    /// peers, error statuses, addresses we cannot dial, and an inner loop
    /// that ran out of candidates for those same reasons.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Rpc(err) => !err.is_unreachable(),
            Error::InvalidAddress(_) => false,
            Error::Exhausted { .. } => false,
            _ => true,
        }
    }
}

/// Bookkeeping for a sequential fallback loop: counts recoverable failures
/// and turns them into one terminal [`Error::Exhausted`].
pub(crate) struct FailureLog {
    what: String,
    attempts: usize,
    last_error: Option<String>,
}

impl FailureLog {
    pub(crate) fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            attempts: 0,
            last_error: None,
        }
    }

    pub(crate) fn record(&mut self, err: Error) {
        self.attempts += 1;
        debug!(what = %self.what, attempt = self.attempts, error = %err, "candidate failed, moving on");
        self.last_error = Some(err.to_string());
    }

    pub(crate) fn exhausted(self) -> Error {
        Error::Exhausted {
            what: self.what,
            attempts: self.attempts,
            last_error: self.last_error,
        }
    }
}
