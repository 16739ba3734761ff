pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::broker::{Broker, Collaborators};
pub use crypto::identity::{Identity, IdentityConfig, KdfParams};
pub use domain::advertise::{AdvertSpec, Advertiser};
pub use domain::commitment::compute_bundle_id;
pub use domain::exchange::{
    ExchangeClient, ExchangeSession, ExchangeSettings, LoginOutcome, MemorySessionCache,
    NoSessionCache, SessionCache, SessionState,
};
pub use domain::model::{
    ExchangeAccount, GlobalLink, Instance, LoginGrant, PaymentEnvironment, ProviderAdvertise,
    ProviderInfo, SessionGrant, StorageInstance, ValueCodec, VirtualService,
};
pub use domain::pricing::{BiddingAgent, FixedQuantityAgent};
pub use domain::publish::{PublishSettings, Publisher};
pub use domain::retrieval::{ProviderRouting, Retriever};
pub use error::{Error, Result};
pub use infra::config::BrokerConfig;
pub use infra::ledger::{LedgerError, LedgerGateway};
pub use infra::routing::DelegatedRouting;
pub use infra::solana::SolanaLedger;
pub use storage::blockstore::{BlockStore, MemoryBlockStore};
pub use storage::dagpb::{PbLink, PbNode};
pub use transport::{multiaddr_to_uri, ConnectClient, ExchangeRpc, RpcError, StorageRpc};
