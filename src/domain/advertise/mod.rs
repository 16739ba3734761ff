//! Signed provider advertisements, registered with a storage index.
//!
//! An advertisement's variant link names the bundle identifier of the exact
//! content set it covers, so a reordered or partial set is a different
//! advertisement.

use crate::crypto::identity::{verify_signature, Identity};
use crate::domain::commitment::compute_bundle_id;
use crate::domain::exchange::{open_storage_session, ExchangeClient};
use crate::domain::model::{
    GlobalLink, Instance, PaymentEnvironment, ProviderAdvertise, VirtualService,
};
use crate::domain::pricing::BiddingAgent;
use crate::error::{Error, Result};
use crate::transport::types::RegisterInstanceRequest;
use crate::transport::StorageRpc;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{SubsecRound, Utc};
use cid::Cid;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, instrument, Span};

const RESOURCE_PREFIX: &str = "values/";

/// Inputs to [`Advertiser::build`].
#[derive(Debug, Clone)]
pub struct AdvertSpec {
    /// The advertising storage instance. An empty DID is filled from the identity.
    pub provider_instance: Instance,
    /// `values/<cid>` names (or bare CIDs) in the order they were committed.
    pub resource_names: Vec<String>,
    pub price: u128,
    pub exchanges: Vec<Instance>,
    pub ttl: Duration,
}

pub struct Advertiser {
    identity: Arc<Identity>,
    storage: Arc<dyn StorageRpc>,
    exchange: ExchangeClient,
    agent: Arc<dyn BiddingAgent>,
    environment: PaymentEnvironment,
    span: Span,
}

impl Advertiser {
    pub fn new(
        storage: Arc<dyn StorageRpc>,
        exchange: ExchangeClient,
        agent: Arc<dyn BiddingAgent>,
    ) -> Self {
        Self {
            identity: exchange.identity().clone(),
            environment: exchange.settings().environment,
            storage,
            exchange,
            agent,
            span: info_span!("advertise"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn build(&self, spec: AdvertSpec) -> Result<ProviderAdvertise> {
        let cids = spec
            .resource_names
            .iter()
            .map(|name| {
                let raw = name.strip_prefix(RESOURCE_PREFIX).unwrap_or(name.as_str());
                raw.parse::<Cid>()
                    .map(|cid| cid.to_string())
                    .map_err(|e| Error::invalid_cid(raw, e))
            })
            .collect::<Result<Vec<_>>>()?;
        let bundle = compute_bundle_id(&cids)?;

        let mut provider = spec.provider_instance;
        if provider.did.is_empty() {
            provider.did = self.identity.did().to_string();
        }

        let now = Utc::now().trunc_subsecs(0);
        let expire_time = chrono::Duration::from_std(spec.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| Error::Config(format!("advertisement ttl {:?} out of range", spec.ttl)))?;

        let mut advert = ProviderAdvertise {
            provider_instance: Some(provider),
            virtual_service: Some(VirtualService {
                behavior_link: Some(GlobalLink::serve_all()),
                variant_link: Some(GlobalLink::variant(&bundle, self.identity.did())),
            }),
            cids,
            price: Some(spec.price),
            environment: Some(self.environment),
            exchanges: spec.exchanges,
            expire_time: Some(expire_time),
            update_time: Some(now),
            signature: String::new(),
        };
        advert.signature = STANDARD.encode(self.identity.sign(&advert.signing_payload()?));
        Ok(advert)
    }

    /// Checks the signature against the DID in the advertisement's provider instance.
    pub fn verify(advert: &ProviderAdvertise) -> Result<bool> {
        let did = advert
            .provider_instance
            .as_ref()
            .map(|p| p.did.as_str())
            .filter(|did| !did.is_empty())
            .ok_or_else(|| Error::Signature("advertisement names no provider DID".to_string()))?;
        if advert.signature.is_empty() {
            return Ok(false);
        }
        verify_signature(did, &advert.signing_payload()?, &advert.signature)
    }

    /// Registers `advert` with the index at `index_endpoint`, paying for the
    /// session through `exchange_endpoint`.
    #[instrument(parent = &self.span, skip_all, fields(index = %index_endpoint))]
    pub async fn register(
        &self,
        index_endpoint: &str,
        exchange_endpoint: &str,
        index_did: &str,
        advert: ProviderAdvertise,
    ) -> Result<()> {
        let service = advert
            .virtual_service
            .clone()
            .unwrap_or_else(VirtualService::serve_all);
        let grant = open_storage_session(
            &self.exchange,
            self.storage.as_ref(),
            index_endpoint,
            exchange_endpoint,
            index_did,
            self.agent.quantity(&service),
        )
        .await?;

        self.storage
            .register_instance(
                &grant.endpoint,
                RegisterInstanceRequest {
                    advertisement: advert,
                },
                &grant.token,
            )
            .await?;
        info!("advertisement registered");
        Ok(())
    }
}
