//! Provider discovery over the delegated routing HTTP API.

use crate::domain::model::ProviderInfo;
use crate::domain::retrieval::ProviderRouting;
use crate::error::{Error, Result};
use crate::transport::RpcError;
use cid::Cid;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct ProvidersResponse {
    #[serde(rename = "Providers", default)]
    providers: Option<Vec<ProviderRecord>>,
}

#[derive(Debug, Deserialize)]
struct ProviderRecord {
    #[serde(rename = "Schema", default)]
    schema: String,
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Addrs", default)]
    addrs: Vec<String>,
}

/// `GET {base}/routing/v1/providers/{cid}` client.
#[derive(Debug, Clone)]
pub struct DelegatedRouting {
    base_url: String,
    http: reqwest::Client,
}

impl DelegatedRouting {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pkv-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn lookup(&self, cid: &Cid) -> Result<Vec<ProviderInfo>> {
        let url = format!("{}/routing/v1/providers/{cid}", self.base_url);
        let transport = |source| {
            Error::Rpc(RpcError::Transport {
                endpoint: self.base_url.clone(),
                source,
            })
        };

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = response.bytes().await.map_err(transport)?;
        if !status.is_success() {
            return Err(RpcError::from_error_body(&self.base_url, status, &body).into());
        }

        let parsed: ProvidersResponse = serde_json::from_slice(&body).map_err(|e| {
            Error::Rpc(RpcError::Decode {
                endpoint: self.base_url.clone(),
                detail: e.to_string(),
            })
        })?;

        Ok(parsed
            .providers
            .unwrap_or_default()
            .into_iter()
            .filter(|record| record.schema.is_empty() || record.schema == "peer")
            .map(|record| ProviderInfo {
                id: record.id,
                multiaddrs: record.addrs,
            })
            .collect())
    }
}

impl ProviderRouting for DelegatedRouting {
    fn find_providers<'a>(&'a self, cid: &'a Cid) -> BoxStream<'a, Result<ProviderInfo>> {
        Box::pin(async_stream::stream! {
            match self.lookup(cid).await {
                Ok(providers) => {
                    debug!(%cid, count = providers.len(), "delegated routing answered");
                    for provider in providers {
                        yield Ok(provider);
                    }
                }
                Err(err) => yield Err(err),
            }
        })
    }
}
