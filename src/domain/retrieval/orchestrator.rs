//! Paid retrieval of a CID from whichever provider answers first.

use super::pipeline::{candidates, StorageCandidate};
use super::ProviderRouting;
use crate::crypto::hashing::verify_block;
use crate::domain::exchange::{open_storage_session, ExchangeClient};
use crate::domain::model::{resource_name, SessionGrant, StorageInstance, VirtualService};
use crate::domain::pricing::BiddingAgent;
use crate::error::{Error, FailureLog, Result};
use crate::transport::types::GetValueRequest;
use crate::transport::{multiaddr_to_uri, StorageRpc};
use cid::Cid;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, info_span, instrument, Span};

pub struct Retriever {
    routing: Arc<dyn ProviderRouting>,
    storage: Arc<dyn StorageRpc>,
    exchange: ExchangeClient,
    agent: Arc<dyn BiddingAgent>,
    span: Span,
}

impl Retriever {
    pub fn new(
        routing: Arc<dyn ProviderRouting>,
        storage: Arc<dyn StorageRpc>,
        exchange: ExchangeClient,
        agent: Arc<dyn BiddingAgent>,
    ) -> Self {
        Self {
            routing,
            storage,
            exchange,
            agent,
            span: info_span!("retrieval"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Fetches the bytes named by `cid`, paying the first provider that can
    /// serve them. Candidates are tried strictly in discovery order.
    #[instrument(parent = &self.span, skip_all, fields(cid = %cid))]
    pub async fn retrieve(&self, cid: &Cid) -> Result<Vec<u8>> {
        let mut failures = FailureLog::new(format!("retrieval of {cid}"));
        let mut stream = candidates(self.routing.as_ref(), self.storage.as_ref(), cid);

        while let Some(candidate) = stream.next().await {
            let outcome = match candidate {
                Ok(candidate) => self.fetch_from(&candidate, cid).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(value) => {
                    info!(bytes = value.len(), "retrieved");
                    return Ok(value);
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => failures.record(err),
            }
        }

        Err(failures.exhausted())
    }

    async fn fetch_from(&self, candidate: &StorageCandidate, cid: &Cid) -> Result<Vec<u8>> {
        debug!(
            index = %candidate.index_endpoint,
            provider = %candidate.instance.provider.did,
            "fetching from storage instance"
        );
        let grant = self.session_credential(&candidate.instance).await?;
        let response = self
            .storage
            .get_value(
                &grant.endpoint,
                GetValueRequest {
                    name: resource_name(cid),
                },
                &grant.token,
            )
            .await?;

        let value = response
            .value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::malformed(&grant.endpoint, "getValue returned an empty value"))?;
        if verify_block(cid, &value) == Some(false) {
            return Err(Error::malformed(
                &grant.endpoint,
                format!("value does not hash to {cid}"),
            ));
        }
        Ok(value)
    }

    /// Storage-session token for `instance`: tries every instance address
    /// against every accepted exchange address, first success wins.
    pub async fn session_credential(&self, instance: &StorageInstance) -> Result<SessionGrant> {
        let did = &instance.provider.did;
        let quantity = self.agent.quantity(&VirtualService::serve_all());
        let mut failures = FailureLog::new(format!("storage session with {did}"));

        for addr in &instance.provider.multiaddrs {
            let storage_endpoint = match multiaddr_to_uri(addr) {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    failures.record(err);
                    continue;
                }
            };

            for exchange in &instance.exchanges {
                for exchange_addr in &exchange.multiaddrs {
                    let attempt = async {
                        let exchange_endpoint = multiaddr_to_uri(exchange_addr)?;
                        open_storage_session(
                            &self.exchange,
                            self.storage.as_ref(),
                            &storage_endpoint,
                            &exchange_endpoint,
                            did,
                            quantity,
                        )
                        .await
                    };
                    match attempt.await {
                        Ok(grant) => return Ok(grant),
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => failures.record(err),
                    }
                }
            }
        }

        Err(failures.exhausted())
    }
}
