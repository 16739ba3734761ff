//! JSON request and response shapes of the exchange and storage services.
//!
//! Responses accept missing fields (`#[serde(default)]`) so the caller, not
//! serde, decides which absences are protocol violations.

use super::json::{base64_bytes, duration_seconds, opt_base64_bytes, opt_u128_string, u128_string};
use crate::domain::model::{ProviderAdvertise, ValueCodec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

// ---- exchange.v1.ExchangeService ----

#[derive(Debug, Default, Serialize)]
pub struct ListPaymentMethodsRequest {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListPaymentMethodsResponse {
    pub payment_methods: Vec<PaymentMethod>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentMethod {
    /// Enum name or number, resolved by the caller.
    pub environment: Option<JsonValue>,
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChallengeRequest {
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetChallengeResponse {
    #[serde(deserialize_with = "opt_base64_bytes::deserialize")]
    pub challenge: Option<Vec<u8>>,
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub username: String,
    pub password: String,
    #[serde(serialize_with = "duration_seconds::serialize")]
    pub ttl: Duration,
    pub proof: DepositProof,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositProof {
    pub chain_digest: String,
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "base64_bytes::serialize")]
    pub challenge: Vec<u8>,
    pub signature: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepositResponse {
    pub account: Option<AccountMessage>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountMessage {
    #[serde(with = "opt_u128_string", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u128>,
    #[serde(with = "opt_u128_string", skip_serializing_if = "Option::is_none")]
    pub balance: Option<u128>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResponse {
    pub access_token: String,
    pub account: Option<AccountMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyTokenRequest {
    #[serde(serialize_with = "u128_string::serialize")]
    pub amount: u128,
    pub audience: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyTokenResponse {
    pub token: String,
}

// ---- kvstore.v1.KvStoreService ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub jwt: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSessionResponse {
    pub jwt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCidRequest {
    pub cid: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCidResponse {
    pub storage_instances: Option<Vec<ProviderAdvertise>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetValueRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetValueResponse {
    #[serde(deserialize_with = "opt_base64_bytes::deserialize")]
    pub value: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValueRequest {
    pub codec: ValueCodec,
    #[serde(serialize_with = "base64_bytes::serialize")]
    pub value: Vec<u8>,
    #[serde(serialize_with = "duration_seconds::serialize")]
    pub ttl: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateValueResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstanceRequest {
    pub advertisement: ProviderAdvertise,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterInstanceResponse {}
