pub mod bundle;

pub use bundle::{bundle_root, compute_bundle_id, KECCAK_256};
