use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Settlement environment an exchange accepts payment on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaymentEnvironment {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
}

impl PaymentEnvironment {
    pub const ALL: [PaymentEnvironment; 4] = [
        PaymentEnvironment::Devnet,
        PaymentEnvironment::Testnet,
        PaymentEnvironment::Mainnet,
        PaymentEnvironment::Localnet,
    ];

    /// Enum value name in the exchange protocol.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PaymentEnvironment::Devnet => "PAYMENT_ENVIRONMENT_DEVNET",
            PaymentEnvironment::Testnet => "PAYMENT_ENVIRONMENT_TESTNET",
            PaymentEnvironment::Mainnet => "PAYMENT_ENVIRONMENT_MAINNET",
            PaymentEnvironment::Localnet => "PAYMENT_ENVIRONMENT_LOCALNET",
        }
    }

    /// Enum value number in the exchange protocol (0 is "unspecified").
    pub fn wire_number(&self) -> i64 {
        match self {
            PaymentEnvironment::Devnet => 1,
            PaymentEnvironment::Testnet => 2,
            PaymentEnvironment::Mainnet => 3,
            PaymentEnvironment::Localnet => 4,
        }
    }

    /// Proto3 JSON allows an enum as either its name or its number.
    pub fn from_wire(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(name) => Self::ALL.into_iter().find(|e| e.wire_name() == name),
            JsonValue::Number(n) => {
                let n = n.as_i64()?;
                Self::ALL.into_iter().find(|e| e.wire_number() == n)
            }
            _ => None,
        }
    }

    /// Public ledger RPC endpoint for this environment.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            PaymentEnvironment::Devnet => "https://api.devnet.solana.com",
            PaymentEnvironment::Testnet => "https://api.testnet.solana.com",
            PaymentEnvironment::Mainnet => "https://api.mainnet-beta.solana.com",
            PaymentEnvironment::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Unknown or missing values become `None` instead of failing the whole message.
    pub(crate) fn deserialize_lenient<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Self>, D::Error> {
        let value = Option::<JsonValue>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(Self::from_wire))
    }
}

impl fmt::Display for PaymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentEnvironment::Devnet => "devnet",
            PaymentEnvironment::Testnet => "testnet",
            PaymentEnvironment::Mainnet => "mainnet",
            PaymentEnvironment::Localnet => "localnet",
        })
    }
}

impl FromStr for PaymentEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.to_string().eq_ignore_ascii_case(wanted) || e.wire_name() == wanted)
            .ok_or_else(|| format!("unknown payment environment {s:?}"))
    }
}

impl Serialize for PaymentEnvironment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for PaymentEnvironment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_wire(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown payment environment {value}")))
    }
}
