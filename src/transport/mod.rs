//! Remote procedure call seams for the exchange and storage services.
//!
//! Both traits take the endpoint per call: one client instance talks to every
//! exchange and storage peer the flows discover.

pub mod client;
pub mod error;
pub(crate) mod json;
pub mod address;
pub mod types;

use async_trait::async_trait;
use types::*;

pub use client::ConnectClient;
pub use error::{Code, RpcError};
pub use address::multiaddr_to_uri;

#[async_trait]
pub trait ExchangeRpc: Send + Sync {
    async fn list_payment_methods(&self, endpoint: &str)
        -> Result<ListPaymentMethodsResponse, RpcError>;

    async fn get_challenge(
        &self,
        endpoint: &str,
        request: GetChallengeRequest,
    ) -> Result<GetChallengeResponse, RpcError>;

    async fn deposit(&self, endpoint: &str, request: DepositRequest)
        -> Result<DepositResponse, RpcError>;

    async fn login(&self, endpoint: &str, request: LoginRequest) -> Result<LoginResponse, RpcError>;

    async fn buy_token(
        &self,
        endpoint: &str,
        request: BuyTokenRequest,
        access_token: &str,
    ) -> Result<BuyTokenResponse, RpcError>;
}

#[async_trait]
pub trait StorageRpc: Send + Sync {
    /// Trades a quota token for a storage-session token.
    async fn create_session(
        &self,
        endpoint: &str,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, RpcError>;

    async fn search_cid(
        &self,
        endpoint: &str,
        request: SearchCidRequest,
    ) -> Result<SearchCidResponse, RpcError>;

    async fn get_value(
        &self,
        endpoint: &str,
        request: GetValueRequest,
        session: &str,
    ) -> Result<GetValueResponse, RpcError>;

    async fn create_value(
        &self,
        endpoint: &str,
        request: CreateValueRequest,
        session: &str,
    ) -> Result<CreateValueResponse, RpcError>;

    async fn register_instance(
        &self,
        endpoint: &str,
        request: RegisterInstanceRequest,
        session: &str,
    ) -> Result<RegisterInstanceResponse, RpcError>;
}
