//! Candidate sequence for a retrieval: provider, then each provider address,
//! then each storage instance that address reports for the CID.
//!
//! The stream yields recoverable failures as `Err` items so the consumer can
//! record them and keep pulling. After a fatal item the stream ends.

use super::ProviderRouting;
use crate::domain::model::StorageInstance;
use crate::error::{Error, Result};
use crate::transport::types::SearchCidRequest;
use crate::transport::{multiaddr_to_uri, StorageRpc};
use cid::Cid;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

/// A storage instance reported by the index at `index_endpoint`.
#[derive(Debug, Clone)]
pub struct StorageCandidate {
    pub index_endpoint: String,
    pub instance: StorageInstance,
}

pub fn candidates<'a>(
    routing: &'a dyn ProviderRouting,
    storage: &'a dyn StorageRpc,
    cid: &'a Cid,
) -> BoxStream<'a, Result<StorageCandidate>> {
    Box::pin(async_stream::stream! {
        let mut providers = routing.find_providers(cid);
        'providers: while let Some(provider) = providers.next().await {
            let provider = match provider {
                Ok(provider) => provider,
                Err(err) => {
                    let fatal = err.is_fatal();
                    yield Err(err);
                    if fatal {
                        break 'providers;
                    }
                    continue;
                }
            };
            debug!(provider = %provider.id, addrs = provider.multiaddrs.len(), "trying provider");

            for addr in &provider.multiaddrs {
                let endpoint = match multiaddr_to_uri(addr) {
                    Ok(endpoint) => endpoint,
                    Err(err) => {
                        yield Err(err);
                        continue;
                    }
                };

                let response = match storage
                    .search_cid(&endpoint, SearchCidRequest { cid: cid.to_string() })
                    .await
                {
                    Ok(response) => response,
                    Err(err) => {
                        let err = Error::from(err);
                        let fatal = err.is_fatal();
                        yield Err(err);
                        if fatal {
                            break 'providers;
                        }
                        continue;
                    }
                };

                let instances = match response.storage_instances {
                    Some(instances) if !instances.is_empty() => instances,
                    _ => {
                        yield Err(Error::malformed(&endpoint, "searchCid returned no storage instances"));
                        break 'providers;
                    }
                };

                for advert in instances {
                    match advert.into_storage_instance(&endpoint) {
                        Ok(instance) => yield Ok(StorageCandidate {
                            index_endpoint: endpoint.clone(),
                            instance,
                        }),
                        Err(err) => {
                            yield Err(err);
                            break 'providers;
                        }
                    }
                }
            }
        }
    })
}
