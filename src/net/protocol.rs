//! Message envelopes crossing the gateway boundary
//!
//! Payloads stay opaque `serde_json::Value` end to end; the gateway routes
//! on the message name alone.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response codes surfaced in [`MsgResponse::code`]
///
/// Backend codes pass through verbatim; the gateway only originates the
/// proxy-failure codes below.
pub mod codes {
    /// Request succeeded
    pub const OK: i32 = 0;
    /// No backend address configured for this message category
    pub const PROXY_NOT_IN_CONNECT: i32 = 4;
    /// Connecting to or calling the backend failed
    pub const PROXY_CONNECT_ERROR: i32 = 5;
}

/// Inbound client request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRequest {
    pub seq: u64,
    /// Dot-separated message name, e.g. `account.login`
    pub name: String,
    #[serde(default)]
    pub payload: Value,
    /// Client-supplied proxy hint; logged, never trusted for routing
    #[serde(default)]
    pub proxy: String,
}

impl MsgRequest {
    pub fn new(seq: u64, name: &str, payload: Value) -> Self {
        Self {
            seq,
            name: name.to_string(),
            payload,
            proxy: String::new(),
        }
    }
}

/// Response delivered back to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgResponse {
    pub seq: u64,
    pub name: String,
    pub code: i32,
    #[serde(default)]
    pub payload: Value,
}

impl MsgResponse {
    /// Empty-OK response echoing the request's seq and name
    pub fn reply_to(req: &MsgRequest) -> Self {
        Self {
            seq: req.seq,
            name: req.name.clone(),
            code: codes::OK,
            payload: Value::Null,
        }
    }
}
