//! Serde adapters for the proto3 JSON mapping: 64-bit integers travel as
//! strings, `bytes` as base64, durations as `"<seconds>s"`.
//!
//! Request-only shapes get a `serialize` half alone.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl StringOrNumber {
    fn into_u128<E: serde::de::Error>(self) -> Result<u128, E> {
        match self {
            StringOrNumber::String(s) => s
                .parse::<u128>()
                .map_err(|e| E::custom(format!("invalid integer {s:?}: {e}"))),
            StringOrNumber::Number(n) => Ok(u128::from(n)),
        }
    }
}

pub(crate) fn decode_base64(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .or_else(|_| URL_SAFE_NO_PAD.decode(value.trim_end_matches('=')))
}

pub(crate) mod u128_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }
}

pub(crate) mod opt_u128_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        Option::<StringOrNumber>::deserialize(deserializer)?
            .map(StringOrNumber::into_u128)
            .transpose()
    }
}

pub(crate) mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }
}

pub(crate) mod opt_base64_bytes {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => decode_base64(&encoded).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

pub(crate) mod duration_seconds {
    use super::*;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}s", value.as_secs()))
    }
}
