pub mod orchestrator;
pub mod pipeline;

pub use orchestrator::Retriever;
pub use pipeline::StorageCandidate;

use crate::domain::model::ProviderInfo;
use crate::error::Result;
use cid::Cid;
use futures::stream::BoxStream;

/// Provider discovery: a lazy, ordered sequence of peers that may hold `cid`.
pub trait ProviderRouting: Send + Sync {
    fn find_providers<'a>(&'a self, cid: &'a Cid) -> BoxStream<'a, Result<ProviderInfo>>;
}
