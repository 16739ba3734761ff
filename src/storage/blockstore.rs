//! Local content-addressed block store the publish flow reads from.

use super::dagpb::PbNode;
use crate::domain::model::{DAG_PB_CODEC, RAW_CODEC};
use crate::error::Result;
use async_trait::async_trait;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Returns the block if it is resident locally. Never goes to the network.
    async fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>>;

    async fn put(&self, cid: Cid, block: Vec<u8>) -> Result<()>;
}

/// In-memory block store.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` as a raw block addressed by its sha2-256 digest.
    pub async fn put_raw(&self, data: &[u8]) -> Cid {
        let cid = Cid::new_v1(RAW_CODEC, Code::Sha2_256.digest(data));
        self.blocks.write().await.insert(cid, data.to_vec());
        cid
    }

    /// Stores an encoded dag-pb node addressed by its sha2-256 digest.
    pub async fn put_node(&self, node: &PbNode) -> Cid {
        let bytes = node.encode();
        let cid = Cid::new_v1(DAG_PB_CODEC, Code::Sha2_256.digest(&bytes));
        self.blocks.write().await.insert(cid, bytes);
        cid
    }

    pub async fn len(&self) -> usize {
        self.blocks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blocks.read().await.is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>> {
        Ok(self.blocks.read().await.get(cid).cloned())
    }

    async fn put(&self, cid: Cid, block: Vec<u8>) -> Result<()> {
        self.blocks.write().await.insert(cid, block);
        Ok(())
    }
}
