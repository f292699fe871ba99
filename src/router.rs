//! Inbound message routing
//!
//! Every client message lands here. The router classifies it by the
//! dot-separated prefix of its name (`account.*` to the login backend,
//! `chat.*` to the chat backend, everything else to the gameplay backend),
//! forwards it through the proxy pool and shapes the backend reply into the
//! client response. One cross-service rule is chained on top: a successful
//! enter-server immediately logs the role into the chat backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::net::conn::GateConn;
use crate::net::protocol::{codes, MsgRequest, MsgResponse};
use crate::net::registry::ConnRegistry;
use crate::proxy::pool::ProxyPool;

/// Gameplay message that establishes the game session
const ENTER_SERVER_MSG: &str = "role.enterServer";
/// Chat login synthesized after a successful enter-server
const CHAT_LOGIN_MSG: &str = "chat.login";

/// Subset of the enter-server reply the chat chaining needs
#[derive(Debug, Deserialize)]
struct EnterServerRsp {
    role: EnterServerRole,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnterServerRole {
    rid: i64,
    nick_name: String,
}

/// Login request the chaining rule sends to the chat backend
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatLoginReq {
    rid: i64,
    nick_name: String,
    token: String,
}

/// Routes inbound client messages to backend services
pub struct GatewayRouter {
    config: GatewayConfig,
    registry: Arc<ConnRegistry>,
    pool: Arc<ProxyPool>,
}

impl GatewayRouter {
    pub fn new(config: GatewayConfig, registry: Arc<ConnRegistry>, pool: Arc<ProxyPool>) -> Self {
        Self {
            config,
            registry,
            pool,
        }
    }

    /// Handle one inbound client request
    pub async fn route(&self, conn: &Arc<dyn GateConn>, req: &MsgRequest) -> MsgResponse {
        debug!("gate route begin: name={} proxy={}", req.name, req.proxy);

        let rsp = self.deal(conn, req).await;

        // a successful enter-server also signs the role into the chat
        // backend, with no client-visible round trip
        if req.name == ENTER_SERVER_MSG && rsp.code == codes::OK {
            self.chain_chat_login(conn, &rsp).await;
        }

        debug!("gate route end: name={} code={}", req.name, rsp.code);
        rsp
    }

    /// Connection-close cascade: identity teardown, then proxy teardown
    pub fn on_client_close(&self, conn: &Arc<dyn GateConn>) {
        let cid = conn.session().cid();
        self.registry.remove_connection(conn);
        if let Some(cid) = cid {
            self.pool.drop_connection(cid);
        }
        info!(
            "client closed: addr={} live={}",
            conn.addr(),
            self.registry.count()
        );
    }

    /// Forward one request to its backend and shape the response
    async fn deal(&self, conn: &Arc<dyn GateConn>, req: &MsgRequest) -> MsgResponse {
        let mut rsp = MsgResponse::reply_to(req);

        let addr = self.backend_for(&req.name);
        if addr.is_empty() {
            rsp.code = codes::PROXY_NOT_IN_CONNECT;
            return rsp;
        }

        let client = match self.pool.get_or_connect(addr, conn).await {
            Ok(client) => client,
            Err(e) => {
                warn!("proxy unavailable: addr={} name={} err={}", addr, req.name, e);
                rsp.code = codes::PROXY_CONNECT_ERROR;
                return rsp;
            }
        };

        match client.call(&req.name, req.payload.clone()).await {
            Ok(reply) => {
                rsp.code = reply.code;
                rsp.payload = reply.payload;
            }
            Err(e) => {
                warn!("proxy call failed: addr={} name={} err={}", addr, req.name, e);
                // evict so the next request for this key dials fresh
                self.pool.evict(&client);
                rsp.code = codes::PROXY_CONNECT_ERROR;
                rsp.payload = Value::Null;
            }
        }
        rsp
    }

    async fn chain_chat_login(&self, conn: &Arc<dyn GateConn>, rsp: &MsgResponse) {
        let enter: EnterServerRsp = match serde_json::from_value(rsp.payload.clone()) {
            Ok(enter) => enter,
            Err(e) => {
                warn!("enter-server reply not decodable, chat login skipped: {}", e);
                return;
            }
        };

        let rid = enter.role.rid;
        let login = ChatLoginReq {
            rid,
            nick_name: enter.role.nick_name,
            token: enter.token,
        };
        let payload = serde_json::to_value(&login).unwrap_or(Value::Null);
        let chained = MsgRequest::new(0, CHAT_LOGIN_MSG, payload);

        let chat_rsp = self.deal(conn, &chained).await;
        if chat_rsp.code == codes::OK {
            debug!("chained chat login: rid={}", rid);
        } else {
            warn!("chained chat login failed: rid={} code={}", rid, chat_rsp.code);
        }
    }

    /// Backend address for a message name; purely lexical, never inspects
    /// the payload
    fn backend_for(&self, name: &str) -> &str {
        match category_prefix(name) {
            Some("account") => &self.config.login_proxy,
            Some("chat") => &self.config.chat_proxy,
            _ => &self.config.game_proxy,
        }
    }
}

/// First segment of a two-segment dotted name, e.g. `account` in
/// `account.login`; any other shape classifies as gameplay
fn category_prefix(name: &str) -> Option<&str> {
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(prefix), Some(_), None) => Some(prefix),
        _ => None,
    }
}
