//! Backend session contracts consumed by the proxy pool
//!
//! The transport collaborator implements these traits. Request/response
//! correlation (sequence numbers) and timeout policy live inside the
//! transport; unsolicited backend traffic arrives as an event stream with
//! the pool's pump task as its single consumer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::proxy::ProxyError;

/// Dials backend services on behalf of the pool
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Establish a session to the backend at `addr`
    async fn connect(&self, addr: &str) -> Result<BackendHandle, ProxyError>;
}

/// An established backend session plus its unsolicited-event stream
pub struct BackendHandle {
    pub session: Arc<dyn BackendSession>,
    pub events: mpsc::UnboundedReceiver<BackendEvent>,
}

/// Unsolicited traffic from an established backend session
#[derive(Debug)]
pub enum BackendEvent {
    /// Backend-initiated message destined for the owning client
    Push { name: String, payload: Value },
    /// The backend dropped the session
    Closed,
}

/// An established request/response session to one backend
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Forward a request and await the correlated reply
    ///
    /// Suspends only the calling task.
    async fn call(&self, name: &str, payload: Value) -> Result<Reply, ProxyError>;

    /// Tear the session down; in-flight calls error out
    fn close(&self);
}

/// Backend reply to a forwarded request
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: i32,
    pub payload: Value,
}
