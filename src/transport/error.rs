//! Failure modes of a unary call against the exchange or storage service.

use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Connect protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// Fallback mapping used when the body carries no Connect error.
    pub fn from_http_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<Code>,
    #[serde(default)]
    message: String,
}

/// A failed remote procedure call.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The peer could not be reached or the connection broke.
    #[error("{endpoint} unreachable: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The peer answered with an error status.
    #[error("{endpoint} returned {code}: {message}")]
    Status {
        endpoint: String,
        code: Code,
        message: String,
    },

    /// The peer answered with a body we cannot decode.
    #[error("cannot decode response from {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },
}

impl RpcError {
    pub(crate) fn from_error_body(endpoint: &str, status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(ErrorBody {
                code: Some(code),
                message,
            }) => RpcError::Status {
                endpoint: endpoint.to_string(),
                code,
                message,
            },
            _ => RpcError::Status {
                endpoint: endpoint.to_string(),
                code: Code::from_http_status(status),
                message: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }

    pub fn code(&self) -> Option<Code> {
        match self {
            RpcError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when nobody usable answered: the peer is down or refused the call.
    /// A body that does not decode means the peer did answer, with garbage.
    pub fn is_unreachable(&self) -> bool {
        !matches!(self, RpcError::Decode { .. })
    }
}
