//! Pushes a locally resident DAG to a storage provider, one paid value per block.

use super::PublishSettings;
use crate::domain::exchange::{open_storage_session, ExchangeClient};
use crate::domain::model::{parse_resource_name, ValueCodec, DAG_PB_CODEC, RAW_CODEC};
use crate::error::{Error, Result};
use crate::storage::blockstore::BlockStore;
use crate::storage::dagpb::decode_links;
use crate::transport::types::CreateValueRequest;
use crate::transport::StorageRpc;
use cid::Cid;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, instrument, Span};

pub struct Publisher {
    storage: Arc<dyn StorageRpc>,
    exchange: ExchangeClient,
    settings: PublishSettings,
    span: Span,
}

impl Publisher {
    pub fn new(storage: Arc<dyn StorageRpc>, exchange: ExchangeClient, settings: PublishSettings) -> Self {
        Self {
            storage,
            exchange,
            settings,
            span: info_span!("publish"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Publishes `root` and, for dag-pb nodes, every descendant depth-first in
    /// link order. Returns one resource name per pushed block, root first.
    #[instrument(parent = &self.span, skip_all, fields(root = %root, provider = %provider_did))]
    pub async fn publish_dag(
        &self,
        exchange: &str,
        provider_did: &str,
        store: &dyn BlockStore,
        root: &Cid,
        ttl: Duration,
    ) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.publish_node(exchange, provider_did, store, *root, ttl, &mut names)
            .await?;
        info!(values = names.len(), "dag published");
        Ok(names)
    }

    fn publish_node<'f>(
        &'f self,
        exchange: &'f str,
        provider_did: &'f str,
        store: &'f dyn BlockStore,
        cid: Cid,
        ttl: Duration,
        names: &'f mut Vec<String>,
    ) -> BoxFuture<'f, Result<()>> {
        async move {
            let block = store.get(&cid).await?.ok_or(Error::BlockNotFound(cid))?;
            let (codec, children) = match cid.codec() {
                RAW_CODEC => (ValueCodec::Raw, Vec::new()),
                DAG_PB_CODEC => (ValueCodec::DagPb, decode_links(&block)?),
                other => return Err(Error::UnsupportedCodec(other)),
            };

            let name = self
                .put_value(exchange, provider_did, block, codec, ttl)
                .await?;
            debug!(%cid, %name, children = children.len(), "block pushed");
            names.push(name);

            for child in children {
                self.publish_node(exchange, provider_did, store, child, ttl, names)
                    .await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Pushes one value under its own quota purchase and storage session.
    pub async fn put_value(
        &self,
        exchange: &str,
        provider_did: &str,
        value: Vec<u8>,
        codec: ValueCodec,
        ttl: Duration,
    ) -> Result<String> {
        let grant = open_storage_session(
            &self.exchange,
            self.storage.as_ref(),
            &self.settings.endpoint,
            exchange,
            provider_did,
            self.settings.quota,
        )
        .await?;

        let response = self
            .storage
            .create_value(&grant.endpoint, CreateValueRequest { codec, value, ttl }, &grant.token)
            .await?;
        if parse_resource_name(&response.name).is_none() {
            return Err(Error::malformed(
                &grant.endpoint,
                format!("createValue returned {:?}, not values/<cid>", response.name),
            ));
        }
        Ok(response.name)
    }
}
