// Unary Connect calls (JSON codec) over reqwest.

use super::error::RpcError;
use super::types::*;
use super::{ExchangeRpc, StorageRpc};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::trace;

const EXCHANGE_SERVICE: &str = "exchange.v1.ExchangeService";
const KVSTORE_SERVICE: &str = "kvstore.v1.KvStoreService";
const CONNECT_PROTOCOL_VERSION: &str = "connect-protocol-version";

/// Talks to any exchange or storage endpoint; the endpoint is chosen per call.
#[derive(Debug, Clone)]
pub struct ConnectClient {
    http: reqwest::Client,
}

impl Default for ConnectClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ConnectClient {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pkv-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http }
    }

    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn unary<Req, Resp>(
        &self,
        endpoint: &str,
        service: &str,
        method: &str,
        request: &Req,
        bearer: Option<&str>,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{service}/{method}", endpoint.trim_end_matches('/'));
        trace!(%url, "connect unary call");

        let mut builder = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONNECT_PROTOCOL_VERSION, "1")
            .json(request);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let transport = |source| RpcError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            return Err(RpcError::from_error_body(endpoint, status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| RpcError::Decode {
            endpoint: endpoint.to_string(),
            detail: format!("{service}/{method}: {e}"),
        })
    }
}

#[async_trait]
impl ExchangeRpc for ConnectClient {
    async fn list_payment_methods(
        &self,
        endpoint: &str,
    ) -> Result<ListPaymentMethodsResponse, RpcError> {
        self.unary(
            endpoint,
            EXCHANGE_SERVICE,
            "ListPaymentMethods",
            &ListPaymentMethodsRequest::default(),
            None,
        )
        .await
    }

    async fn get_challenge(
        &self,
        endpoint: &str,
        request: GetChallengeRequest,
    ) -> Result<GetChallengeResponse, RpcError> {
        self.unary(endpoint, EXCHANGE_SERVICE, "GetChallenge", &request, None)
            .await
    }

    async fn deposit(
        &self,
        endpoint: &str,
        request: DepositRequest,
    ) -> Result<DepositResponse, RpcError> {
        self.unary(endpoint, EXCHANGE_SERVICE, "Deposit", &request, None)
            .await
    }

    async fn login(&self, endpoint: &str, request: LoginRequest) -> Result<LoginResponse, RpcError> {
        self.unary(endpoint, EXCHANGE_SERVICE, "Login", &request, None)
            .await
    }

    async fn buy_token(
        &self,
        endpoint: &str,
        request: BuyTokenRequest,
        access_token: &str,
    ) -> Result<BuyTokenResponse, RpcError> {
        self.unary(
            endpoint,
            EXCHANGE_SERVICE,
            "BuyToken",
            &request,
            Some(access_token),
        )
        .await
    }
}

#[async_trait]
impl StorageRpc for ConnectClient {
    async fn create_session(
        &self,
        endpoint: &str,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, RpcError> {
        self.unary(endpoint, KVSTORE_SERVICE, "CreateSession", &request, None)
            .await
    }

    async fn search_cid(
        &self,
        endpoint: &str,
        request: SearchCidRequest,
    ) -> Result<SearchCidResponse, RpcError> {
        self.unary(endpoint, KVSTORE_SERVICE, "SearchCid", &request, None)
            .await
    }

    async fn get_value(
        &self,
        endpoint: &str,
        request: GetValueRequest,
        session: &str,
    ) -> Result<GetValueResponse, RpcError> {
        self.unary(endpoint, KVSTORE_SERVICE, "GetValue", &request, Some(session))
            .await
    }

    async fn create_value(
        &self,
        endpoint: &str,
        request: CreateValueRequest,
        session: &str,
    ) -> Result<CreateValueResponse, RpcError> {
        self.unary(
            endpoint,
            KVSTORE_SERVICE,
            "CreateValue",
            &request,
            Some(session),
        )
        .await
    }

    async fn register_instance(
        &self,
        endpoint: &str,
        request: RegisterInstanceRequest,
        session: &str,
    ) -> Result<RegisterInstanceResponse, RpcError> {
        self.unary(
            endpoint,
            KVSTORE_SERVICE,
            "RegisterInstance",
            &request,
            Some(session),
        )
        .await
    }
}
