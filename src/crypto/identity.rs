//! Identity and credential derivation from a mnemonic.
//!
//! Everything here is a pure function of the root secret and the
//! [`IdentityConfig`]: re-deriving always reproduces the same keypair, DID
//! and login password, which is what lets the exchange flow log in again
//! without a credential store.

use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hkdf::Hkdf;
use sha2::Sha256;
use solana_sdk::derivation_path::DerivationPath;
use solana_sdk::signature::Signature;
use solana_sdk::signer::keypair::{
    generate_seed_from_seed_phrase_and_passphrase, keypair_from_seed_and_derivation_path, Keypair,
};
use solana_sdk::signer::Signer;
use std::fmt;
use zeroize::Zeroizing;

/// SLIP-0010 path of the first Ed25519 account used by existing exchange users.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/784'/0'/0'/0'";

/// Salt historically compiled into clients. Public, so only fit for fixtures.
pub const FIXTURE_SALT: [u8; 32] = [
    0x5e, 0xc5, 0x57, 0xbd, 0x6f, 0x5d, 0xbb, 0xa2, 0xf2, 0xba, 0x8c, 0xf7, 0x31, 0xc6, 0xc2, 0x5b,
    0xb8, 0x2a, 0x5e, 0x94, 0x52, 0x10, 0xae, 0x6e, 0xe7, 0xe1, 0xa2, 0x06, 0xff, 0xa8, 0xe7, 0x5d,
];

// multicodec ed25519-pub, varint encoded
const ED25519_PUB_PREFIX: [u8; 2] = [0xed, 0x01];
const DID_KEY_PREFIX: &str = "did:key:z";
const PASSWORD_CONTEXT: &[u8] = b"password";
const PASSWORD_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Per-user derivation inputs.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub derivation_path: String,
    pub argon2_salt: Vec<u8>,
    pub hkdf_salt: Vec<u8>,
    pub kdf: KdfParams,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
            argon2_salt: FIXTURE_SALT.to_vec(),
            hkdf_salt: FIXTURE_SALT.to_vec(),
            kdf: KdfParams::default(),
        }
    }
}

impl IdentityConfig {
    pub fn uses_fixture_salts(&self) -> bool {
        self.argon2_salt == FIXTURE_SALT || self.hkdf_salt == FIXTURE_SALT
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("derivation_path", &self.derivation_path)
            .field("argon2_salt", &hex::encode(&self.argon2_salt))
            .field("hkdf_salt", &hex::encode(&self.hkdf_salt))
            .field("kdf", &self.kdf)
            .finish()
    }
}

/// Signing keypair, DID and login password derived from one root secret.
pub struct Identity {
    keypair: Keypair,
    did: String,
    password: Zeroizing<String>,
    root_secret: Zeroizing<String>,
}

impl Identity {
    pub fn derive(root_secret: &str, config: &IdentityConfig) -> Result<Self> {
        let phrase = root_secret.split_whitespace().collect::<Vec<_>>().join(" ");
        if phrase.is_empty() {
            return Err(Error::Identity("root secret is empty".to_string()));
        }

        let keypair = derive_keypair(&phrase, &config.derivation_path)?;
        let did = encode_did(&keypair.pubkey().to_bytes());
        let password = derive_password(&phrase, config)?;

        Ok(Self {
            keypair,
            did,
            password,
            root_secret: Zeroizing::new(phrase),
        })
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    /// Exchange login name. Same as the DID.
    pub fn username(&self) -> &str {
        &self.did
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn root_secret(&self) -> &str {
        &self.root_secret
    }

    /// Base58 public key, the identity's address on the ledger.
    pub fn ledger_address(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.pubkey().to_bytes()
    }

    /// Raw 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign_message(message).as_ref().to_vec()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("did", &self.did)
            .field("ledger_address", &self.ledger_address())
            .finish_non_exhaustive()
    }
}

fn derive_keypair(phrase: &str, path: &str) -> Result<Keypair> {
    let seed = Zeroizing::new(generate_seed_from_seed_phrase_and_passphrase(phrase, ""));
    let path = DerivationPath::from_absolute_path_str(path)
        .map_err(|e| Error::Identity(format!("invalid derivation path {path:?}: {e}")))?;
    keypair_from_seed_and_derivation_path(&seed, Some(path))
        .map_err(|e| Error::Identity(format!("key derivation failed: {e}")))
}

fn derive_password(phrase: &str, config: &IdentityConfig) -> Result<Zeroizing<String>> {
    let params = Params::new(
        config.kdf.memory_kib,
        config.kdf.iterations,
        config.kdf.parallelism,
        Some(PASSWORD_LEN),
    )
    .map_err(|e| Error::Identity(format!("invalid argon2 parameters: {e}")))?;

    let mut ikm = Zeroizing::new([0u8; PASSWORD_LEN]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(phrase.as_bytes(), &config.argon2_salt, ikm.as_mut())
        .map_err(|e| Error::Identity(format!("argon2id failed: {e}")))?;

    let mut okm = Zeroizing::new([0u8; PASSWORD_LEN]);
    Hkdf::<Sha256>::new(Some(&config.hkdf_salt), ikm.as_ref())
        .expand(PASSWORD_CONTEXT, okm.as_mut())
        .map_err(|e| Error::Identity(format!("hkdf expand failed: {e}")))?;

    Ok(Zeroizing::new(STANDARD.encode(okm.as_ref())))
}

/// `did:key` for an Ed25519 public key.
pub fn encode_did(public_key: &[u8; 32]) -> String {
    let mut bytes = Vec::with_capacity(ED25519_PUB_PREFIX.len() + public_key.len());
    bytes.extend_from_slice(&ED25519_PUB_PREFIX);
    bytes.extend_from_slice(public_key);
    format!("{DID_KEY_PREFIX}{}", bs58::encode(bytes).into_string())
}

/// Inverse of [`encode_did`].
pub fn decode_did(did: &str) -> Result<[u8; 32]> {
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| Error::Signature(format!("{did:?} is not a base58btc did:key")))?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| Error::Signature(format!("{did:?}: {e}")))?;
    bytes
        .strip_prefix(&ED25519_PUB_PREFIX)
        .and_then(|key| <[u8; 32]>::try_from(key).ok())
        .ok_or_else(|| Error::Signature(format!("{did:?} is not an Ed25519 did:key")))
}

/// Verifies a base64 Ed25519 signature made by the holder of `did`.
pub fn verify_signature(did: &str, message: &[u8], signature_b64: &str) -> Result<bool> {
    let public_key = decode_did(did)?;
    let raw = crate::transport::json::decode_base64(signature_b64)
        .map_err(|e| Error::Signature(format!("signature is not base64: {e}")))?;
    let signature = Signature::try_from(raw.as_slice())
        .map_err(|e| Error::Signature(format!("signature has the wrong length: {e}")))?;
    Ok(signature.verify(&public_key, message))
}
