//! Per-(backend address, cid) proxy client pool
//!
//! Structural mutation of the pool map happens under one mutex; connects
//! and calls on resolved clients run outside it. Each established session
//! gets a pump task that forwards backend-initiated pushes to the owning
//! gateway connection and evicts the entry when the backend drops the
//! session.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::net::conn::GateConn;
use crate::proxy::backend::{BackendConnector, BackendEvent};
use crate::proxy::client::ProxyClient;
use crate::proxy::ProxyError;

/// Pool of outbound proxy sessions, keyed by backend address and owning cid
pub struct ProxyPool {
    connector: Arc<dyn BackendConnector>,
    clients: Mutex<HashMap<String, HashMap<i64, Arc<ProxyClient>>>>,
}

impl ProxyPool {
    pub fn new(connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            connector,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the proxy for `(addr, cid of conn)`, connecting lazily
    ///
    /// A fresh client is inserted before the connect attempt so concurrent
    /// requests for the same key share one entry; the connect itself runs
    /// outside the pool lock. On connect failure the placeholder is evicted
    /// and the next request for the key dials fresh.
    pub async fn get_or_connect(
        self: &Arc<Self>,
        addr: &str,
        conn: &Arc<dyn GateConn>,
    ) -> Result<Arc<ProxyClient>, ProxyError> {
        let cid = conn.session().cid().ok_or(ProxyError::Unregistered)?;

        let client = {
            let mut clients = self.clients.lock();
            let by_cid = clients.entry(addr.to_string()).or_default();
            if let Some(existing) = by_cid.get(&cid) {
                return Ok(existing.clone());
            }
            let fresh = Arc::new(ProxyClient::new(addr, cid, conn.clone()));
            fresh.mark_connecting();
            by_cid.insert(cid, fresh.clone());
            fresh
        };

        match self.connector.connect(addr).await {
            Ok(handle) => {
                client.attach(handle.session);
                self.spawn_event_pump(client.clone(), handle.events);
                debug!("proxy connected: addr={} cid={}", addr, cid);
                Ok(client)
            }
            Err(e) => {
                warn!("proxy connect failed: addr={} cid={} err={}", addr, cid, e);
                client.mark_failed();
                self.remove_if_same(addr, cid, &client);
                Err(e)
            }
        }
    }

    /// Evict a client whose call failed so the next request dials fresh
    pub fn evict(&self, client: &Arc<ProxyClient>) {
        self.remove_if_same(client.addr(), client.cid(), client);
        client.close();
    }

    /// Drop every proxy owned by a closing client connection
    ///
    /// Entries are unhooked under the lock, sessions closed outside it; no
    /// backend session outlives its client.
    pub fn drop_connection(&self, cid: i64) {
        let doomed: Vec<Arc<ProxyClient>> = {
            let mut clients = self.clients.lock();
            clients
                .values_mut()
                .filter_map(|by_cid| by_cid.remove(&cid))
                .collect()
        };

        if !doomed.is_empty() {
            debug!("dropping {} proxy session(s) for cid={}", doomed.len(), cid);
        }
        for client in &doomed {
            client.close();
        }
    }

    /// Live entries across all backends
    pub fn count(&self) -> usize {
        self.clients.lock().values().map(|by_cid| by_cid.len()).sum()
    }

    pub fn contains(&self, addr: &str, cid: i64) -> bool {
        self.clients
            .lock()
            .get(addr)
            .is_some_and(|by_cid| by_cid.contains_key(&cid))
    }

    /// Remove the entry only while it still holds this client instance;
    /// a replacement dialed in the meantime is left alone
    fn remove_if_same(&self, addr: &str, cid: i64, client: &Arc<ProxyClient>) {
        let mut clients = self.clients.lock();
        if let Some(by_cid) = clients.get_mut(addr) {
            if by_cid.get(&cid).is_some_and(|c| Arc::ptr_eq(c, client)) {
                by_cid.remove(&cid);
            }
        }
    }

    fn spawn_event_pump(
        self: &Arc<Self>,
        client: Arc<ProxyClient>,
        mut events: mpsc::UnboundedReceiver<BackendEvent>,
    ) {
        let pool = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    BackendEvent::Push { name, payload } => {
                        client.gate_conn().push(&name, payload);
                    }
                    BackendEvent::Closed => break,
                }
            }

            debug!(
                "backend closed proxy session: addr={} cid={}",
                client.addr(),
                client.cid()
            );
            client.mark_closed();
            if let Some(pool) = pool.upgrade() {
                pool.remove_if_same(client.addr(), client.cid(), &client);
            }
        });
    }
}
