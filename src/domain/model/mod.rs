//! Data model shared by the exchange, retrieval and publish flows.
//!
//! Types here double as the JSON shapes of the exchange and storage
//! services; fields a peer may omit are `Option`s and get validated once,
//! where the response enters the crate.

use cid::{Cid, Version};
use serde::{Serialize, Serializer};

mod account;
mod advertise;
mod environment;

pub use account::{Challenge, ExchangeAccount, LoginGrant, SessionGrant, SignedChallenge};
pub use advertise::{
    GlobalLink, Instance, ProviderAdvertise, ProviderInfo, StorageInstance, VirtualService,
    SERVE_ALL,
};
pub use environment::PaymentEnvironment;

/// Multicodec code for raw bytes.
pub const RAW_CODEC: u64 = 0x55;
/// Multicodec code for a dag-pb linked node.
pub const DAG_PB_CODEC: u64 = 0x70;

const RESOURCE_PREFIX: &str = "values/";

/// Codec tag the storage service records with a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCodec {
    Raw,
    DagPb,
}

impl ValueCodec {
    pub fn wire_number(&self) -> i32 {
        match self {
            ValueCodec::Raw => 1,
            ValueCodec::DagPb => 2,
        }
    }

    pub fn from_wire_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(ValueCodec::Raw),
            2 => Some(ValueCodec::DagPb),
            _ => None,
        }
    }

    /// Multicodec code of CIDs naming values with this tag.
    pub fn multicodec(&self) -> u64 {
        match self {
            ValueCodec::Raw => RAW_CODEC,
            ValueCodec::DagPb => DAG_PB_CODEC,
        }
    }
}

impl Serialize for ValueCodec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.wire_number())
    }
}

/// `values/<cid>`, the storage service's handle for a stored value.
pub fn resource_name(cid: &Cid) -> String {
    format!("{RESOURCE_PREFIX}{cid}")
}

/// Parses `values/<cid>`; only version-1 CIDs are accepted.
pub fn parse_resource_name(name: &str) -> Option<Cid> {
    let cid = name.strip_prefix(RESOURCE_PREFIX)?.parse::<Cid>().ok()?;
    (cid.version() == Version::V1).then_some(cid)
}
