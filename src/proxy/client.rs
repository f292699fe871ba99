//! Outbound proxy session to one backend on behalf of one client connection

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::net::conn::GateConn;
use crate::proxy::backend::{BackendSession, Reply};
use crate::proxy::ProxyError;

/// Proxy connection state
///
/// `Failed` and `Closed` are terminal: a later request for the same
/// `(addr, cid)` key creates a fresh client instead of resurrecting a dead
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// Created, no connect attempt yet
    Disconnected,
    /// Connect in flight; concurrent requests for the same key share this entry
    Connecting,
    /// Backend session established
    Connected,
    /// Connect failed
    Failed,
    /// Session torn down
    Closed,
}

/// One outbound backend session, owned exclusively by its pool entry
pub struct ProxyClient {
    addr: String,
    cid: i64,
    gate_conn: Arc<dyn GateConn>,
    state: Mutex<ProxyState>,
    session: Mutex<Option<Arc<dyn BackendSession>>>,
}

impl fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyClient")
            .field("addr", &self.addr)
            .field("cid", &self.cid)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ProxyClient {
    pub(crate) fn new(addr: &str, cid: i64, gate_conn: Arc<dyn GateConn>) -> Self {
        Self {
            addr: addr.to_string(),
            cid,
            gate_conn,
            state: Mutex::new(ProxyState::Disconnected),
            session: Mutex::new(None),
        }
    }

    /// Backend address this proxy dials
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Cid of the owning gateway connection
    pub fn cid(&self) -> i64 {
        self.cid
    }

    pub fn state(&self) -> ProxyState {
        *self.state.lock()
    }

    /// The gateway connection this proxy forwards backend pushes to
    pub(crate) fn gate_conn(&self) -> &Arc<dyn GateConn> {
        &self.gate_conn
    }

    pub(crate) fn mark_connecting(&self) {
        *self.state.lock() = ProxyState::Connecting;
    }

    /// Attach the established session; the client becomes callable
    pub(crate) fn attach(&self, session: Arc<dyn BackendSession>) {
        *self.session.lock() = Some(session);
        *self.state.lock() = ProxyState::Connected;
    }

    pub(crate) fn mark_failed(&self) {
        *self.state.lock() = ProxyState::Failed;
    }

    /// The backend closed the session underneath us
    pub(crate) fn mark_closed(&self) {
        self.session.lock().take();
        *self.state.lock() = ProxyState::Closed;
    }

    /// Close the session from the gateway side (owning client went away)
    pub(crate) fn close(&self) {
        let session = self.session.lock().take();
        *self.state.lock() = ProxyState::Closed;
        if let Some(session) = session {
            session.close();
        }
    }

    /// Forward a request over the attached backend session
    ///
    /// The session handle is cloned out of the lock first; the await never
    /// holds it.
    pub async fn call(&self, name: &str, payload: Value) -> Result<Reply, ProxyError> {
        let session = self
            .session
            .lock()
            .clone()
            .ok_or(ProxyError::NotConnected)?;
        session.call(name, payload).await
    }
}
