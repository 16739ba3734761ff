//! Deterministic identifier for an ordered set of CIDs.
//!
//! Each CID's binary form is hashed into a leaf, the leaves are folded into a
//! binary Merkle root in the order given, and the root is wrapped back into a
//! CID. The same list always yields the same identifier and reordering the
//! list changes it.

use crate::crypto::hashing::{keccak256, merkle_root};
use crate::domain::model::RAW_CODEC;
use crate::error::{Error, Result};
use cid::multihash::Multihash;
use cid::Cid;
use primitive_types::H256;

/// Multihash code for keccak-256.
pub const KECCAK_256: u64 = 0x1b;

/// Merkle root over the parsed CIDs, leaves in input order.
pub fn bundle_root<S: AsRef<str>>(cids: &[S]) -> Result<H256> {
    let leaves = cids
        .iter()
        .map(|s| {
            let input = s.as_ref();
            let cid = input
                .parse::<Cid>()
                .map_err(|e| Error::invalid_cid(input, e))?;
            Ok(keccak256(&cid.to_bytes()))
        })
        .collect::<Result<Vec<_>>>()?;

    merkle_root(leaves).ok_or(Error::EmptyBundle)
}

/// Bundle identifier: the Merkle root as a keccak-256 multihash inside a
/// version-1, raw-codec CID. `to_string` gives the canonical base32 form.
pub fn compute_bundle_id<S: AsRef<str>>(cids: &[S]) -> Result<Cid> {
    let root = bundle_root(cids)?;
    let digest = Multihash::<64>::wrap(KECCAK_256, root.as_bytes())
        .map_err(|e| Error::Codec(format!("cannot wrap bundle root: {e}")))?;
    Ok(Cid::new_v1(RAW_CODEC, digest))
}
