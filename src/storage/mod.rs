pub mod blockstore;
pub mod dagpb;

pub use blockstore::{BlockStore, MemoryBlockStore};
pub use dagpb::{PbLink, PbNode};
