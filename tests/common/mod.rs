//! In-process fakes for the exchange, storage, ledger and routing collaborators.
//!
//! One axum server answers both the exchange and the key-value store services
//! over the Connect JSON protocol, so tests exercise the real reqwest transport.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use cid::Cid;
use futures::stream::{self, BoxStream, StreamExt};
use multihash_codetable::{Code, MultihashDigest};
use pkv_client::crypto::identity::verify_signature;
use pkv_client::domain::exchange::{ExchangeClient, ExchangeSettings};
use pkv_client::{
    ConnectClient, Identity, IdentityConfig, KdfParams, LedgerError, LedgerGateway, ProviderInfo,
    ProviderRouting,
};
use rand::RngCore;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const MNEMONIC: &str =
    "wild shiver source slam trouble talent fantasy depart sleep burger fit trumpet";
pub const OTHER_MNEMONIC: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";
pub const DEPOSIT_ADDRESS: &str = "Exchange1111111111111111111111111111111111";
pub const RAW: u64 = 0x55;
pub const DAG_PB: u64 = 0x70;

/// Cheap KDF cost so tests do not spend seconds in Argon2id.
pub fn test_identity_config() -> IdentityConfig {
    IdentityConfig {
        kdf: KdfParams {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        },
        ..IdentityConfig::default()
    }
}

pub fn test_identity(mnemonic: &str) -> Arc<Identity> {
    Arc::new(Identity::derive(mnemonic, &test_identity_config()).expect("derive identity"))
}

pub fn raw_cid(data: &[u8]) -> Cid {
    Cid::new_v1(RAW, Code::Sha2_256.digest(data))
}

pub fn dag_pb_cid(data: &[u8]) -> Cid {
    Cid::new_v1(DAG_PB, Code::Sha2_256.digest(data))
}

/// Multiaddr of a loopback HTTP endpoint.
pub fn maddr(port: u16) -> String {
    format!("/ip4/127.0.0.1/tcp/{port}/http")
}

/// Port nothing listens on.
pub async fn dead_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

#[derive(Debug, Default, Clone)]
pub struct Counters {
    pub list_payment_methods: usize,
    pub get_challenge: usize,
    pub deposit: usize,
    pub login: usize,
    pub buy_token: usize,
    pub create_session: usize,
    pub search: usize,
    pub get_value: usize,
    pub create_value: usize,
    pub register_instance: usize,
}

#[derive(Debug)]
pub struct FakeState {
    pub counters: Counters,
    pub payment_environment: String,
    /// username -> (password, account id, balance)
    pub accounts: HashMap<String, (String, u128, u128)>,
    pub outstanding_challenges: HashSet<Vec<u8>>,
    /// Deposits are acknowledged but never turn into a usable account.
    pub refuse_registration: bool,
    /// Every Deposit call is rejected after the ledger payment.
    pub reject_deposit: bool,
    /// Account object returned by Deposit in place of the real one.
    pub malformed_deposit: Option<Value>,
    pub empty_token: bool,
    pub empty_session: bool,
    pub empty_value: bool,
    pub audiences: Vec<String>,
    pub amounts: Vec<String>,
    pub sessions: HashSet<String>,
    pub values: HashMap<String, Vec<u8>>,
    pub value_ttls: Vec<String>,
    /// `None` answers searchCid without a storageInstances field.
    pub instances: Option<Vec<Value>>,
    pub adverts: Vec<Value>,
    next_id: u128,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            counters: Counters::default(),
            payment_environment: "PAYMENT_ENVIRONMENT_DEVNET".to_string(),
            accounts: HashMap::new(),
            outstanding_challenges: HashSet::new(),
            refuse_registration: false,
            reject_deposit: false,
            malformed_deposit: None,
            empty_token: false,
            empty_session: false,
            empty_value: false,
            audiences: Vec::new(),
            amounts: Vec::new(),
            sessions: HashSet::new(),
            values: HashMap::new(),
            value_ttls: Vec::new(),
            instances: Some(Vec::new()),
            adverts: Vec::new(),
            next_id: 0,
        }
    }
}

impl FakeState {
    fn next(&mut self) -> u128 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_account(&mut self, identity: &Identity) {
        let id = self.next();
        self.accounts.insert(
            identity.username().to_string(),
            (identity.password().to_string(), id, 5_000),
        );
    }

    pub fn put_raw(&mut self, data: &[u8]) -> Cid {
        let cid = raw_cid(data);
        self.values.insert(format!("values/{cid}"), data.to_vec());
        cid
    }
}

pub struct FakeServer {
    pub url: String,
    pub port: u16,
    pub did: String,
    pub state: Arc<Mutex<FakeState>>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        Self::start_with(FakeState::default()).await
    }

    pub async fn start_with(state: FakeState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let router = Router::new()
            .route("/:service/:method", post(dispatch))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let port = listener.local_addr().expect("local addr").port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake server");
        });

        Self {
            url: format!("http://127.0.0.1:{port}"),
            port,
            did: format!("did:key:zStorage{port}"),
            state,
            handle,
        }
    }

    pub fn maddr(&self) -> String {
        maddr(self.port)
    }

    pub fn counters(&self) -> Counters {
        self.state.lock().expect("state").counters.clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().expect("state"))
    }

    /// searchCid entry naming this server as both storage instance and exchange.
    pub fn self_instance(&self, cid: &Cid) -> Value {
        json!({
            "providerInstance": { "did": self.did, "multiaddrs": [self.maddr()] },
            "exchanges": [{ "did": "did:key:zExchange", "multiaddrs": [self.maddr()] }],
            "cids": [cid.to_string()],
            "environment": "PAYMENT_ENVIRONMENT_DEVNET",
            "price": "1"
        })
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn dispatch(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path((service, method)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut st = state.lock().expect("state");
    match (service.as_str(), method.as_str()) {
        ("exchange.v1.ExchangeService", "ListPaymentMethods") => {
            st.counters.list_payment_methods += 1;
            Json(json!({
                "paymentMethods": [
                    { "environment": "PAYMENT_ENVIRONMENT_LOCALNET", "address": "" },
                    { "environment": st.payment_environment, "address": DEPOSIT_ADDRESS }
                ]
            }))
            .into_response()
        }
        ("exchange.v1.ExchangeService", "GetChallenge") => {
            st.counters.get_challenge += 1;
            let mut challenge = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut challenge);
            st.outstanding_challenges.insert(challenge.clone());
            Json(json!({
                "challenge": STANDARD.encode(&challenge),
                "startTime": Utc::now().to_rfc3339(),
            }))
            .into_response()
        }
        ("exchange.v1.ExchangeService", "Deposit") => {
            st.counters.deposit += 1;
            if st.reject_deposit {
                return error(StatusCode::BAD_REQUEST, "invalid_argument", "deposit rejected");
            }
            let username = body["username"].as_str().unwrap_or_default().to_string();
            let password = body["password"].as_str().unwrap_or_default().to_string();
            let proof = &body["proof"];
            let challenge = STANDARD
                .decode(proof["challenge"].as_str().unwrap_or_default())
                .unwrap_or_default();
            if !st.outstanding_challenges.remove(&challenge) {
                return error(StatusCode::BAD_REQUEST, "invalid_argument", "unknown or reused challenge");
            }
            let signature = proof["signature"].as_str().unwrap_or_default();
            if !verify_signature(&username, &challenge, signature).unwrap_or(false) {
                return error(StatusCode::FORBIDDEN, "permission_denied", "bad challenge signature");
            }
            if proof["chainDigest"].as_str().unwrap_or_default().is_empty()
                || body["ttl"].as_str() != Some("86400s")
            {
                return error(StatusCode::BAD_REQUEST, "invalid_argument", "bad deposit proof");
            }
            let id = st.next();
            if !st.refuse_registration {
                st.accounts.insert(username, (password, id, 10_000_000_000));
            }
            if let Some(account) = &st.malformed_deposit {
                return Json(json!({ "account": account })).into_response();
            }
            Json(json!({ "account": { "accountId": id.to_string(), "balance": "10000000000" } }))
                .into_response()
        }
        ("exchange.v1.ExchangeService", "Login") => {
            st.counters.login += 1;
            let username = body["username"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            match st.accounts.get(username) {
                Some((expected, id, balance)) if expected == password => Json(json!({
                    "accessToken": format!("access-{id}"),
                    "account": { "accountId": id.to_string(), "balance": balance.to_string() }
                }))
                .into_response(),
                Some(_) => error(StatusCode::UNAUTHORIZED, "unauthenticated", "wrong password"),
                None => error(StatusCode::NOT_FOUND, "not_found", "account not found"),
            }
        }
        ("exchange.v1.ExchangeService", "BuyToken") => {
            st.counters.buy_token += 1;
            if !bearer(&headers).is_some_and(|t| t.starts_with("access-")) {
                return error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing access token");
            }
            st.audiences
                .push(body["audience"].as_str().unwrap_or_default().to_string());
            st.amounts
                .push(body["amount"].as_str().unwrap_or_default().to_string());
            let token = if st.empty_token {
                String::new()
            } else {
                format!("quota-{}", st.next())
            };
            Json(json!({ "token": token })).into_response()
        }
        ("kvstore.v1.KvStoreService", "CreateSession") => {
            st.counters.create_session += 1;
            let jwt = body["jwt"].as_str().unwrap_or_default();
            if !jwt.starts_with("quota-") {
                return error(StatusCode::UNAUTHORIZED, "unauthenticated", "bad quota token");
            }
            if st.empty_session {
                return Json(json!({ "jwt": "" })).into_response();
            }
            let session = format!("session-{}", st.next());
            st.sessions.insert(session.clone());
            Json(json!({ "jwt": session })).into_response()
        }
        ("kvstore.v1.KvStoreService", "SearchCid") => {
            st.counters.search += 1;
            match &st.instances {
                Some(instances) => Json(json!({ "storageInstances": instances })).into_response(),
                None => Json(json!({})).into_response(),
            }
        }
        ("kvstore.v1.KvStoreService", "GetValue") => {
            st.counters.get_value += 1;
            if !bearer(&headers).is_some_and(|t| st.sessions.contains(&t)) {
                return error(StatusCode::UNAUTHORIZED, "unauthenticated", "no session");
            }
            if st.empty_value {
                return Json(json!({})).into_response();
            }
            let name = body["name"].as_str().unwrap_or_default();
            match st.values.get(name) {
                Some(value) => Json(json!({ "value": STANDARD.encode(value) })).into_response(),
                None => error(StatusCode::NOT_FOUND, "not_found", "no such value"),
            }
        }
        ("kvstore.v1.KvStoreService", "CreateValue") => {
            st.counters.create_value += 1;
            if !bearer(&headers).is_some_and(|t| st.sessions.contains(&t)) {
                return error(StatusCode::UNAUTHORIZED, "unauthenticated", "no session");
            }
            let value = STANDARD
                .decode(body["value"].as_str().unwrap_or_default())
                .unwrap_or_default();
            let cid = match body["codec"].as_i64() {
                Some(1) => raw_cid(&value),
                Some(2) => dag_pb_cid(&value),
                _ => return error(StatusCode::BAD_REQUEST, "invalid_argument", "unknown codec"),
            };
            st.value_ttls
                .push(body["ttl"].as_str().unwrap_or_default().to_string());
            let name = format!("values/{cid}");
            st.values.insert(name.clone(), value);
            Json(json!({ "name": name })).into_response()
        }
        ("kvstore.v1.KvStoreService", "RegisterInstance") => {
            st.counters.register_instance += 1;
            if !bearer(&headers).is_some_and(|t| st.sessions.contains(&t)) {
                return error(StatusCode::UNAUTHORIZED, "unauthenticated", "no session");
            }
            st.adverts.push(body["advertisement"].clone());
            Json(json!({})).into_response()
        }
        _ => error(StatusCode::NOT_FOUND, "unimplemented", "no such method"),
    }
}

/// Ledger that settles every transfer instantly.
#[derive(Default)]
pub struct FakeLedger {
    pub transfers: Mutex<Vec<(String, u64)>>,
    pub fail: bool,
}

impl FakeLedger {
    pub fn failing() -> Self {
        Self {
            transfers: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().expect("transfers").len()
    }
}

#[async_trait]
impl LedgerGateway for FakeLedger {
    async fn transfer(
        &self,
        _payer: &Identity,
        recipient: &str,
        amount: u64,
    ) -> Result<String, LedgerError> {
        if self.fail {
            return Err(LedgerError::Submission("insufficient funds".to_string()));
        }
        let mut transfers = self.transfers.lock().expect("transfers");
        transfers.push((recipient.to_string(), amount));
        Ok(format!("digest-{}", transfers.len()))
    }
}

/// Routing that always answers with the same providers, in order.
pub struct StaticRouting {
    pub providers: Vec<ProviderInfo>,
}

impl StaticRouting {
    pub fn new(addrs: Vec<Vec<String>>) -> Self {
        Self {
            providers: addrs
                .into_iter()
                .enumerate()
                .map(|(i, multiaddrs)| ProviderInfo {
                    id: format!("provider-{i}"),
                    multiaddrs,
                })
                .collect(),
        }
    }
}

impl ProviderRouting for StaticRouting {
    fn find_providers<'a>(&'a self, _cid: &'a Cid) -> BoxStream<'a, pkv_client::Result<ProviderInfo>> {
        stream::iter(self.providers.clone().into_iter().map(Ok)).boxed()
    }
}

pub fn exchange_client(identity: Arc<Identity>, ledger: Arc<FakeLedger>) -> ExchangeClient {
    ExchangeClient::new(
        identity,
        Arc::new(ConnectClient::default()),
        ledger,
        ExchangeSettings::default(),
    )
}
