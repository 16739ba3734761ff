//! Account lifecycle against an exchange: deposit, challenge-response
//! registration, login and quota purchase.

use super::cache::{NoSessionCache, SessionCache, SessionKey};
use crate::crypto::identity::Identity;
use crate::domain::model::{Challenge, ExchangeAccount, LoginGrant, PaymentEnvironment};
use crate::error::{Error, Result};
use crate::infra::ledger::LedgerGateway;
use crate::transport::types::{
    AccountMessage, BuyTokenRequest, DepositProof, DepositRequest, GetChallengeRequest,
    LoginRequest,
};
use crate::transport::{Code, ExchangeRpc, RpcError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, instrument, warn, Span};

/// Deposit made when an identity first registers with an exchange.
pub const DEFAULT_BOOTSTRAP_DEPOSIT: u64 = 10_000_000_000;
/// Lifetime requested for the account created by a deposit.
pub const DEFAULT_DEPOSIT_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub environment: PaymentEnvironment,
    pub bootstrap_deposit: u64,
    pub deposit_ttl: Duration,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            environment: PaymentEnvironment::default(),
            bootstrap_deposit: DEFAULT_BOOTSTRAP_DEPOSIT,
            deposit_ttl: DEFAULT_DEPOSIT_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    LoggedIn(LoginGrant),
    /// The exchange has no account for this identity yet.
    NotRegistered,
}

/// Per-endpoint authentication state.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    LoggedIn(LoginGrant),
    Failed,
}

/// Exchange operations on behalf of one identity. Holds no per-endpoint
/// state itself; see [`ExchangeSession`] for that.
#[derive(Clone)]
pub struct ExchangeClient {
    identity: Arc<Identity>,
    rpc: Arc<dyn ExchangeRpc>,
    ledger: Arc<dyn LedgerGateway>,
    settings: ExchangeSettings,
    cache: Arc<dyn SessionCache>,
    span: Span,
}

impl ExchangeClient {
    pub fn new(
        identity: Arc<Identity>,
        rpc: Arc<dyn ExchangeRpc>,
        ledger: Arc<dyn LedgerGateway>,
        settings: ExchangeSettings,
    ) -> Self {
        let span = info_span!("exchange", did = %identity.did(), environment = %settings.environment);
        Self {
            identity,
            rpc,
            ledger,
            settings,
            cache: Arc::new(NoSessionCache),
            span,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Fresh, unauthenticated session against `endpoint`.
    pub fn session(&self, endpoint: &str) -> ExchangeSession<'_> {
        ExchangeSession {
            client: self,
            endpoint: endpoint.to_string(),
            state: SessionState::Unauthenticated,
        }
    }

    /// Ledger address the exchange accepts deposits at for the configured environment.
    #[instrument(parent = &self.span, skip_all, fields(endpoint = %endpoint))]
    pub async fn payment_address(&self, endpoint: &str) -> Result<String> {
        let response = self.rpc.list_payment_methods(endpoint).await?;
        response
            .payment_methods
            .into_iter()
            .find(|method| {
                !method.address.is_empty()
                    && method
                        .environment
                        .as_ref()
                        .and_then(PaymentEnvironment::from_wire)
                        == Some(self.settings.environment)
            })
            .map(|method| method.address)
            .ok_or_else(|| Error::NoPaymentMethod {
                endpoint: endpoint.to_string(),
                environment: self.settings.environment,
            })
    }

    /// Pays `amount` to the exchange and waits for settlement. Returns the
    /// transaction digest.
    #[instrument(parent = &self.span, skip_all, fields(endpoint = %endpoint, amount = amount))]
    pub async fn make_deposit(&self, endpoint: &str, amount: u64) -> Result<String> {
        let address = self.payment_address(endpoint).await?;
        debug!(%address, "paying exchange deposit address");
        let digest = self.ledger.transfer(&self.identity, &address, amount).await?;
        Ok(digest)
    }

    #[instrument(parent = &self.span, skip_all, fields(endpoint = %endpoint))]
    pub async fn challenge(&self, endpoint: &str) -> Result<Challenge> {
        let response = self
            .rpc
            .get_challenge(
                endpoint,
                GetChallengeRequest {
                    address: self.identity.ledger_address(),
                },
            )
            .await?;

        let bytes = response
            .challenge
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::malformed(endpoint, "challenge is empty"))?;
        let start_time = response
            .start_time
            .ok_or_else(|| Error::malformed(endpoint, "challenge has no start time"))?;
        Ok(Challenge::new(bytes, start_time))
    }

    /// One login attempt. A missing account is an outcome, not an error; a
    /// rejected password stays an error and never leads to a paid registration.
    #[instrument(parent = &self.span, skip_all, fields(endpoint = %endpoint))]
    pub async fn login(&self, endpoint: &str) -> Result<LoginOutcome> {
        let request = LoginRequest {
            username: self.identity.username().to_string(),
            password: self.identity.password().to_string(),
        };
        let response = match self.rpc.login(endpoint, request).await {
            Ok(response) => response,
            Err(RpcError::Status {
                code: Code::NotFound,
                message,
                ..
            }) => {
                debug!(%message, "exchange does not know this identity");
                return Ok(LoginOutcome::NotRegistered);
            }
            Err(err) => return Err(err.into()),
        };

        if response.access_token.is_empty() {
            return Err(Error::malformed(endpoint, "login returned an empty access token"));
        }
        let account = response
            .account
            .ok_or_else(|| Error::malformed(endpoint, "login returned no account"))?;
        let account = ExchangeAccount {
            account_id: account
                .account_id
                .ok_or_else(|| Error::malformed(endpoint, "login account has no id"))?,
            balance: account.balance.unwrap_or_default(),
        };

        Ok(LoginOutcome::LoggedIn(LoginGrant {
            access_token: response.access_token,
            account,
        }))
    }

    /// Pays `deposit` and opens an account with a signed challenge as proof.
    ///
    /// Any failure after the payment settled is fatal, so no fallback loop
    /// can reach a second deposit.
    #[instrument(parent = &self.span, skip_all, fields(endpoint = %endpoint, deposit = deposit))]
    pub async fn register(&self, endpoint: &str, deposit: u64) -> Result<ExchangeAccount> {
        self.register_paid(endpoint, deposit)
            .await
            .map(|(account, _)| account)
    }

    async fn register_paid(&self, endpoint: &str, deposit: u64) -> Result<(ExchangeAccount, String)> {
        let digest = self.make_deposit(endpoint, deposit).await?;
        match self.open_account(endpoint, &digest).await {
            Ok(account) => {
                info!(account_id = %account.account_id, balance = %account.balance, %digest, "exchange account registered");
                Ok((account, digest))
            }
            Err(err) => Err(after_payment(endpoint, &digest, err)),
        }
    }

    async fn open_account(&self, endpoint: &str, digest: &str) -> Result<ExchangeAccount> {
        let signed = self.challenge(endpoint).await?.sign(&self.identity);

        let request = DepositRequest {
            username: self.identity.username().to_string(),
            password: self.identity.password().to_string(),
            ttl: self.settings.deposit_ttl,
            proof: DepositProof {
                chain_digest: digest.to_string(),
                start_time: signed.start_time,
                challenge: signed.challenge,
                signature: signed.signature,
            },
        };
        let response = self.rpc.deposit(endpoint, request).await?;
        deposited_account(endpoint, response.account)
    }

    /// Logs in, registering with the bootstrap deposit first if the account
    /// does not exist. Registration is attempted at most once.
    pub async fn ensure_logged_in(&self, endpoint: &str) -> Result<LoginGrant> {
        let mut session = self.session(endpoint);
        session.authenticate().await.cloned()
    }

    /// Buys `quantity` quota units scoped to `audience`.
    #[instrument(parent = &self.span, skip_all, fields(endpoint = %endpoint, audience = %audience, quantity = %quantity))]
    pub async fn purchase_quota(
        &self,
        endpoint: &str,
        audience: &str,
        quantity: u128,
    ) -> Result<String> {
        let grant = self.ensure_logged_in(endpoint).await?;
        let key = SessionKey {
            account_id: grant.account.account_id,
            audience: audience.to_string(),
            exchange: endpoint.to_string(),
        };
        if let Some(token) = self.cache.get(&key) {
            debug!("reusing cached quota token");
            return Ok(token);
        }

        let response = self
            .rpc
            .buy_token(
                endpoint,
                BuyTokenRequest {
                    amount: quantity,
                    audience: audience.to_string(),
                },
                &grant.access_token,
            )
            .await?;
        if response.token.is_empty() {
            return Err(Error::malformed(endpoint, "buyToken returned an empty token"));
        }

        self.cache.put(key, response.token.clone());
        Ok(response.token)
    }

    async fn login_or_register(&self, endpoint: &str) -> Result<LoginGrant> {
        if let LoginOutcome::LoggedIn(grant) = self.login(endpoint).await? {
            return Ok(grant);
        }

        warn!(parent: &self.span, %endpoint, "login failed, no account yet; registering");
        let (_, digest) = self
            .register_paid(endpoint, self.settings.bootstrap_deposit)
            .await?;

        match self.login(endpoint).await {
            Ok(LoginOutcome::LoggedIn(grant)) => Ok(grant),
            Ok(LoginOutcome::NotRegistered) => Err(Error::RegistrationFailed {
                endpoint: endpoint.to_string(),
                digest,
                reason: "login still finds no account".to_string(),
            }),
            Err(err) => Err(after_payment(endpoint, &digest, err)),
        }
    }
}

/// Escalates a recoverable error raised after the deposit `digest` settled.
fn after_payment(endpoint: &str, digest: &str, err: Error) -> Error {
    if err.is_fatal() {
        return err;
    }
    Error::RegistrationFailed {
        endpoint: endpoint.to_string(),
        digest: digest.to_string(),
        reason: err.to_string(),
    }
}

/// Account returned by a deposit. Zero id or balance counts as absent.
fn deposited_account(endpoint: &str, account: Option<AccountMessage>) -> Result<ExchangeAccount> {
    let account = account.ok_or_else(|| Error::malformed(endpoint, "deposit returned no account"))?;
    match (account.account_id, account.balance) {
        (Some(account_id), Some(balance)) if account_id != 0 && balance != 0 => {
            Ok(ExchangeAccount { account_id, balance })
        }
        _ => Err(Error::malformed(
            endpoint,
            "deposit response lacks an account id or balance",
        )),
    }
}

/// Authentication state machine for one (identity, exchange endpoint) pair.
///
/// `Unauthenticated -> LoggedIn` on success, `Unauthenticated -> Failed` on
/// any error. A failed session stays failed.
pub struct ExchangeSession<'a> {
    client: &'a ExchangeClient,
    endpoint: String,
    state: SessionState,
}

impl<'a> ExchangeSession<'a> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn authenticate(&mut self) -> Result<&LoginGrant> {
        match self.state {
            SessionState::LoggedIn(_) => {}
            SessionState::Failed => {
                return Err(Error::SessionFailed {
                    endpoint: self.endpoint.clone(),
                })
            }
            SessionState::Unauthenticated => {
                match self.client.login_or_register(&self.endpoint).await {
                    Ok(grant) => self.state = SessionState::LoggedIn(grant),
                    Err(err) => {
                        self.state = SessionState::Failed;
                        return Err(err);
                    }
                }
            }
        }

        match &self.state {
            SessionState::LoggedIn(grant) => Ok(grant),
            _ => Err(Error::SessionFailed {
                endpoint: self.endpoint.clone(),
            }),
        }
    }
}
