//! Connection identity registry
//!
//! Cross-references every live connection by three keys: the gateway cid,
//! the account uid (after login) and the in-game rid (after role enter).
//! The three tables are locked independently so a role-enter on one
//! connection never contends with a login touching only the uid table;
//! operations that span tables take the locks strictly one at a time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::net::conn::GateConn;

/// Message pushed to a connection superseded by a newer login for its uid
pub const ROB_LOGIN_MSG: &str = "robLogin";

/// Connection identity registry
pub struct ConnRegistry {
    next_cid: AtomicI64,
    conns: RwLock<HashMap<i64, Arc<dyn GateConn>>>,
    users: RwLock<HashMap<i64, Arc<dyn GateConn>>>,
    roles: RwLock<HashMap<i64, Arc<dyn GateConn>>>,
}

impl ConnRegistry {
    pub fn new() -> Self {
        Self {
            next_cid: AtomicI64::new(0),
            conns: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly accepted connection and assign its cid
    ///
    /// Cids are monotonically increasing for the process lifetime and never
    /// reused.
    pub fn register(&self, conn: Arc<dyn GateConn>) -> i64 {
        let cid = self.next_cid.fetch_add(1, Ordering::Relaxed) + 1;
        conn.session().set_cid(cid);
        self.conns.write().insert(cid, conn);
        cid
    }

    /// Record a successful account login
    ///
    /// A second login for the same uid supersedes the first: the old
    /// connection gets a best-effort [`ROB_LOGIN_MSG`] push before its
    /// mapping is overwritten. It is notified, not closed.
    pub fn login(&self, conn: &Arc<dyn GateConn>, token: &str, uid: i64) {
        {
            let mut users = self.users.write();
            if let Some(old) = users.get(&uid) {
                if !Arc::ptr_eq(old, conn) {
                    info!(
                        "rob login: uid={} old={} new={}",
                        uid,
                        old.addr(),
                        conn.addr()
                    );
                    old.push(ROB_LOGIN_MSG, Value::Null);
                }
            }
            users.insert(uid, conn.clone());
        }
        conn.session().set_login(token, uid);
    }

    /// Tear down the login identity of a connection
    pub fn logout(&self, conn: &Arc<dyn GateConn>) {
        self.remove_user(conn);
    }

    /// Record the role session established for a connection
    ///
    /// Overwrites any prior mapping for the rid; upstream game logic
    /// guarantees a role has a single concurrent session.
    pub fn role_enter(&self, conn: &Arc<dyn GateConn>, rid: i64) {
        conn.session().set_rid(rid);
        self.roles.write().insert(rid, conn.clone());
    }

    /// Remove a closed connection from every table
    ///
    /// Idempotent: a second call finds no cid and changes nothing.
    pub fn remove_connection(&self, conn: &Arc<dyn GateConn>) {
        if let Some(cid) = conn.session().take_cid() {
            self.conns.write().remove(&cid);
        }
        self.remove_user(conn);
    }

    fn remove_user(&self, conn: &Arc<dyn GateConn>) {
        if let Some(uid) = conn.session().uid() {
            let mut users = self.users.write();
            // a stale close must not delete a newer session's mapping
            if users.get(&uid).is_some_and(|c| Arc::ptr_eq(c, conn)) {
                users.remove(&uid);
            }
        }

        if let Some(rid) = conn.session().rid() {
            let mut roles = self.roles.write();
            if roles.get(&rid).is_some_and(|c| Arc::ptr_eq(c, conn)) {
                roles.remove(&rid);
            }
        }

        conn.session().clear_login();
    }

    /// Connection currently logged in as `uid`
    pub fn conn_by_uid(&self, uid: i64) -> Option<Arc<dyn GateConn>> {
        self.users.read().get(&uid).cloned()
    }

    /// Push a message to the connection owning `rid`
    ///
    /// Returns `false` for the `rid <= 0` sentinel and for offline roles;
    /// an offline target is an expected steady state, not an error.
    pub fn push_by_role(&self, rid: i64, name: &str, payload: Value) -> bool {
        if rid <= 0 {
            return false;
        }
        let conn = self.roles.read().get(&rid).cloned();
        match conn {
            Some(conn) => {
                conn.push(name, payload);
                true
            }
            None => false,
        }
    }

    /// Broadcast a message to every connection with an established role
    pub fn push_all(&self, name: &str, payload: &Value) {
        let conns: Vec<Arc<dyn GateConn>> = self.roles.read().values().cloned().collect();
        for conn in conns {
            conn.push(name, payload.clone());
        }
    }

    /// Number of live connections
    pub fn count(&self) -> usize {
        self.conns.read().len()
    }
}

impl Default for ConnRegistry {
    fn default() -> Self {
        Self::new()
    }
}
