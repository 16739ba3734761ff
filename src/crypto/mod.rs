pub mod hashing;
pub mod identity;

pub use hashing::{hash_pair, keccak256, merkle_root, verify_block};
pub use identity::{decode_did, encode_did, verify_signature, Identity, IdentityConfig, KdfParams};
