pub mod cache;
pub mod session;

pub use cache::{MemorySessionCache, NoSessionCache, SessionCache, SessionKey};
pub use session::{
    ExchangeClient, ExchangeSession, ExchangeSettings, LoginOutcome, SessionState,
    DEFAULT_BOOTSTRAP_DEPOSIT, DEFAULT_DEPOSIT_TTL,
};

use crate::domain::model::SessionGrant;
use crate::error::{Error, Result};
use crate::transport::types::CreateSessionRequest;
use crate::transport::StorageRpc;

/// Buys quota at `exchange_endpoint` for `audience` and trades it for a
/// storage-session token at `storage_endpoint`.
pub async fn open_storage_session(
    exchange: &ExchangeClient,
    storage: &dyn StorageRpc,
    storage_endpoint: &str,
    exchange_endpoint: &str,
    audience: &str,
    quantity: u128,
) -> Result<SessionGrant> {
    let quota = exchange
        .purchase_quota(exchange_endpoint, audience, quantity)
        .await?;
    let response = storage
        .create_session(storage_endpoint, CreateSessionRequest { jwt: quota })
        .await?;
    if response.jwt.is_empty() {
        return Err(Error::malformed(
            storage_endpoint,
            "createSession returned an empty jwt",
        ));
    }
    Ok(SessionGrant {
        token: response.jwt,
        endpoint: storage_endpoint.to_string(),
    })
}
