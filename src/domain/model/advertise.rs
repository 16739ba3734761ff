use super::environment::PaymentEnvironment;
use crate::error::{Error, Result};
use crate::transport::json::opt_u128_string;
use chrono::{DateTime, Utc};
use cid::Cid;
use serde::{Deserialize, Serialize};

/// Behaviour every provider offers: serve whatever it holds.
pub const SERVE_ALL: &str = "serve_all";
const SERVE_ALL_MAINTAINER: &str = "did:example:foo";
const SERVE_ALL_VERSION: &str = "v0.1.0";

/// A reachable service instance: storage provider, index or exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub did: String,
    pub multiaddrs: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub peer_id: String,
}

/// Named, versioned link to a behaviour or content variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalLink {
    pub name: String,
    pub maintainer: String,
    pub version: String,
    pub description: String,
    pub display_name: String,
    pub signature: String,
}

impl GlobalLink {
    pub fn serve_all() -> Self {
        Self {
            name: SERVE_ALL.to_string(),
            maintainer: SERVE_ALL_MAINTAINER.to_string(),
            version: SERVE_ALL_VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Variant link naming an exact content set by its bundle identifier.
    pub fn variant(bundle_id: &Cid, maintainer: &str) -> Self {
        Self {
            name: bundle_id.to_string(),
            maintainer: maintainer.to_string(),
            version: SERVE_ALL_VERSION.to_string(),
            ..Default::default()
        }
    }
}

/// Capability descriptor: a behaviour plus, optionally, the content variant
/// it applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_link: Option<GlobalLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_link: Option<GlobalLink>,
}

impl VirtualService {
    pub fn serve_all() -> Self {
        Self {
            behavior_link: Some(GlobalLink::serve_all()),
            variant_link: None,
        }
    }
}

/// What a provider publishes to a routing index. Also the shape of each
/// storage instance returned by a CID search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderAdvertise {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_instance: Option<Instance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_service: Option<VirtualService>,
    pub cids: Vec<String>,
    #[serde(with = "opt_u128_string", skip_serializing_if = "Option::is_none")]
    pub price: Option<u128>,
    #[serde(
        deserialize_with = "PaymentEnvironment::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub environment: Option<PaymentEnvironment>,
    pub exchanges: Vec<Instance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

impl ProviderAdvertise {
    /// Canonical bytes covered by the signature: the advertisement with an
    /// empty signature field, serialized in declaration order.
    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        let mut unsigned = self.clone();
        unsigned.signature.clear();
        Ok(serde_json::to_vec(&unsigned)?)
    }

    /// Validates a search result entry received from `endpoint`.
    pub fn into_storage_instance(self, endpoint: &str) -> Result<StorageInstance> {
        let provider = self
            .provider_instance
            .ok_or_else(|| Error::malformed(endpoint, "storage instance without provider instance"))?;
        if provider.did.is_empty() {
            return Err(Error::malformed(endpoint, "storage instance without a DID"));
        }
        if self.exchanges.is_empty() {
            return Err(Error::malformed(
                endpoint,
                format!("storage instance {} accepts no exchanges", provider.did),
            ));
        }
        Ok(StorageInstance {
            provider,
            exchanges: self.exchanges,
        })
    }
}

/// A storage instance known to hold the requested content, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInstance {
    pub provider: Instance,
    /// Never empty.
    pub exchanges: Vec<Instance>,
}

/// One entry of the provider-discovery sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: String,
    pub multiaddrs: Vec<String>,
}
