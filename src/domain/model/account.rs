use crate::crypto::identity::Identity;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

/// Ledger-backed account held by an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeAccount {
    pub account_id: u128,
    pub balance: u128,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub access_token: String,
    pub account: ExchangeAccount,
}

/// Storage-session token together with the storage endpoint that issued it.
/// The token is only good against that endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub endpoint: String,
}

/// Challenge issued by an exchange for one registration attempt.
///
/// Not `Clone`: signing consumes it, so the same bytes cannot back two
/// deposit proofs.
#[derive(Debug)]
pub struct Challenge {
    bytes: Vec<u8>,
    start_time: DateTime<Utc>,
}

impl Challenge {
    pub fn new(bytes: Vec<u8>, start_time: DateTime<Utc>) -> Self {
        Self { bytes, start_time }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn sign(self, identity: &Identity) -> SignedChallenge {
        let signature = STANDARD.encode(identity.sign(&self.bytes));
        SignedChallenge {
            challenge: self.bytes,
            start_time: self.start_time,
            signature,
        }
    }
}

/// A challenge signed with the identity key, ready to go into a deposit proof.
#[derive(Debug)]
pub struct SignedChallenge {
    pub challenge: Vec<u8>,
    pub start_time: DateTime<Utc>,
    /// Base64 Ed25519 signature over `challenge`.
    pub signature: String,
}
