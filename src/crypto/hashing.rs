// Keccak-256 hashing for the ordered Merkle tree and digest checks for fetched blocks.

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use primitive_types::H256;
use sha3::{Digest, Keccak256};

/// Hashes arbitrary bytes into a H256 digest.
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}

/// Interior node: `keccak256(left || right)`. Pairs are never sorted.
pub fn hash_pair(left: &H256, right: &H256) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    H256::from_slice(&hasher.finalize())
}

/// Root of a binary Merkle tree over `leaves`, kept in input order.
///
/// The leaf level is padded with zero hashes up to the next power of two
/// before pairing. A single leaf is its own root. Returns `None` for no leaves.
pub fn merkle_root(mut leaves: Vec<H256>) -> Option<H256> {
    if leaves.is_empty() {
        return None;
    }
    leaves.resize(leaves.len().next_power_of_two(), H256::zero());

    let mut level = leaves;
    while level.len() > 1 {
        level = level
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level.into_iter().next()
}

/// Checks `data` against the multihash inside `cid`.
///
/// `None` when the hash function is not one we can compute.
pub fn verify_block(cid: &Cid, data: &[u8]) -> Option<bool> {
    let code = Code::try_from(cid.hash().code()).ok()?;
    Some(code.digest(data) == *cid.hash())
}
