//! The paid block broker.
//!
//! Owns one identity and wires it into the exchange, retrieval, publish and
//! advertise flows. It is the entry point for applications:
//! 1.  `retrieve` fetches a CID from whichever provider answers first.
//! 2.  `publish_dag` pushes a locally stored DAG to a storage provider.
//! 3.  `advertise` signs and registers a provider advertisement.

use crate::crypto::identity::Identity;
use crate::domain::advertise::{AdvertSpec, Advertiser};
use crate::domain::exchange::{ExchangeClient, ExchangeSettings, SessionCache};
use crate::domain::model::ProviderAdvertise;
use crate::domain::pricing::{BiddingAgent, FixedQuantityAgent};
use crate::domain::publish::{PublishSettings, Publisher};
use crate::domain::retrieval::{ProviderRouting, Retriever};
use crate::error::{Error, Result};
use crate::infra::config::BrokerConfig;
use crate::infra::ledger::LedgerGateway;
use crate::infra::routing::DelegatedRouting;
use crate::infra::solana::SolanaLedger;
use crate::storage::blockstore::BlockStore;
use crate::transport::{ConnectClient, ExchangeRpc, StorageRpc};
use cid::Cid;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info_span, warn, Instrument, Span};

/// External collaborators the broker talks through.
#[derive(Clone)]
pub struct Collaborators {
    pub exchange_rpc: Arc<dyn ExchangeRpc>,
    pub storage_rpc: Arc<dyn StorageRpc>,
    pub ledger: Arc<dyn LedgerGateway>,
    pub routing: Arc<dyn ProviderRouting>,
    pub agent: Arc<dyn BiddingAgent>,
}

pub struct Broker {
    identity: Arc<Identity>,
    collaborators: Collaborators,
    publish: PublishSettings,
    exchange: ExchangeClient,
    retriever: Retriever,
    publisher: Publisher,
    advertiser: Advertiser,
    span: Span,
}

impl Broker {
    /// Derives the identity and builds the network collaborators from `config`.
    /// Needs `routing_url` to be set.
    pub async fn from_config(config: &BrokerConfig) -> Result<Self> {
        let routing_url = config.routing_url.clone().ok_or_else(|| {
            Error::Config("a routing URL is required to build the default router".to_string())
        })?;
        let identity = derive_identity(config).await?;

        let connect = Arc::new(ConnectClient::new(config.request_timeout));
        let collaborators = Collaborators {
            exchange_rpc: connect.clone(),
            storage_rpc: connect,
            ledger: Arc::new(SolanaLedger::new(config.ledger_rpc_url.clone())),
            routing: Arc::new(DelegatedRouting::new(routing_url, config.request_timeout)),
            agent: Arc::new(FixedQuantityAgent::default()),
        };
        Ok(Self::new(config, identity, collaborators))
    }

    pub fn new(config: &BrokerConfig, identity: Arc<Identity>, collaborators: Collaborators) -> Self {
        let span = info_span!("broker", did = %identity.did());
        let settings = ExchangeSettings {
            environment: config.environment,
            bootstrap_deposit: config.bootstrap_deposit,
            deposit_ttl: config.deposit_ttl,
        };
        let exchange = ExchangeClient::new(
            identity.clone(),
            collaborators.exchange_rpc.clone(),
            collaborators.ledger.clone(),
            settings,
        )
        .with_span(info_span!(parent: &span, "exchange"));
        let publish = PublishSettings {
            endpoint: config.publish_endpoint.clone(),
            quota: config.publish_quota,
        };

        Self::assemble(identity, exchange, collaborators, publish, span)
    }

    fn assemble(
        identity: Arc<Identity>,
        exchange: ExchangeClient,
        collaborators: Collaborators,
        publish: PublishSettings,
        span: Span,
    ) -> Self {
        let storage = collaborators.storage_rpc.clone();
        let agent = collaborators.agent.clone();
        let retriever = Retriever::new(
            collaborators.routing.clone(),
            storage.clone(),
            exchange.clone(),
            agent.clone(),
        )
        .with_span(info_span!(parent: &span, "retrieval"));
        let publisher = Publisher::new(storage.clone(), exchange.clone(), publish.clone())
            .with_span(info_span!(parent: &span, "publish"));
        let advertiser = Advertiser::new(storage, exchange.clone(), agent)
            .with_span(info_span!(parent: &span, "advertise"));
        Self {
            identity,
            collaborators,
            publish,
            exchange,
            retriever,
            publisher,
            advertiser,
            span,
        }
    }

    /// Puts `cache` in front of every quota purchase the broker makes.
    pub fn with_session_cache(self, cache: Arc<dyn SessionCache>) -> Self {
        let exchange = self.exchange.with_cache(cache);
        Self::assemble(self.identity, exchange, self.collaborators, self.publish, self.span)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn exchange(&self) -> &ExchangeClient {
        &self.exchange
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn advertiser(&self) -> &Advertiser {
        &self.advertiser
    }

    pub async fn retrieve(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.retriever.retrieve(cid).await
    }

    pub async fn publish_dag(
        &self,
        exchange: &str,
        provider_did: &str,
        store: &dyn BlockStore,
        root: &Cid,
        ttl: Duration,
    ) -> Result<Vec<String>> {
        self.publisher
            .publish_dag(exchange, provider_did, store, root, ttl)
            .await
    }

    /// Builds, signs and registers an advertisement for `spec`.
    pub async fn advertise(
        &self,
        index_endpoint: &str,
        exchange_endpoint: &str,
        index_did: &str,
        spec: AdvertSpec,
    ) -> Result<ProviderAdvertise> {
        let advert = self.advertiser.build(spec)?;
        self.advertiser
            .register(index_endpoint, exchange_endpoint, index_did, advert.clone())
            .instrument(self.span.clone())
            .await?;
        Ok(advert)
    }
}

/// Argon2id with the production cost takes a while; keep it off the reactor.
pub async fn derive_identity(config: &BrokerConfig) -> Result<Arc<Identity>> {
    let mnemonic = config.mnemonic.clone();
    let identity_config = config.identity.clone();
    let identity = tokio::task::spawn_blocking(move || Identity::derive(&mnemonic, &identity_config))
        .await
        .map_err(|e| Error::Identity(format!("derivation task failed: {e}")))??;
    if config.identity.uses_fixture_salts() {
        warn!(did = %identity.did(), "identity derived with the public fixture salts");
    }
    Ok(Arc::new(identity))
}
