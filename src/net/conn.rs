//! Gateway connection contract and per-connection session state
//!
//! The transport layer terminates the wire protocol and hands the gateway an
//! object implementing [`GateConn`]. Everything the gateway itself needs to
//! know about a connection lives in its [`SessionState`].

use parking_lot::Mutex;
use serde_json::Value;

/// A client connection as seen by the gateway
///
/// Implemented by the transport collaborator. `push` is best-effort: the
/// gateway never learns whether a pushed message reached the wire.
pub trait GateConn: Send + Sync {
    /// Typed session state owned by this connection
    fn session(&self) -> &SessionState;

    /// Remote address, for logging
    fn addr(&self) -> &str;

    /// Push a server-initiated message to the client
    fn push(&self, name: &str, payload: Value);
}

/// Typed per-connection session state
///
/// One instance per connection. Identity fields are written by the registry
/// as the connection moves through register/login/role-enter/teardown and
/// read concurrently by routing code, so the slots sit behind one small
/// mutex.
#[derive(Debug, Default)]
pub struct SessionState {
    fields: Mutex<Fields>,
}

#[derive(Debug, Default)]
struct Fields {
    cid: Option<i64>,
    uid: Option<i64>,
    rid: Option<i64>,
    token: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway-assigned connection id, set once at registration
    pub fn cid(&self) -> Option<i64> {
        self.fields.lock().cid
    }

    /// Account id, present while logged in
    pub fn uid(&self) -> Option<i64> {
        self.fields.lock().uid
    }

    /// Role id, present while a role session is established
    pub fn rid(&self) -> Option<i64> {
        self.fields.lock().rid
    }

    /// Opaque session token, present while logged in
    pub fn token(&self) -> Option<String> {
        self.fields.lock().token.clone()
    }

    pub(crate) fn set_cid(&self, cid: i64) {
        self.fields.lock().cid = Some(cid);
    }

    pub(crate) fn take_cid(&self) -> Option<i64> {
        self.fields.lock().cid.take()
    }

    pub(crate) fn set_login(&self, token: &str, uid: i64) {
        let mut fields = self.fields.lock();
        fields.token = Some(token.to_string());
        fields.uid = Some(uid);
    }

    pub(crate) fn set_rid(&self, rid: i64) {
        self.fields.lock().rid = Some(rid);
    }

    pub(crate) fn clear_login(&self) {
        let mut fields = self.fields.lock();
        fields.token = None;
        fields.uid = None;
        fields.rid = None;
    }
}
