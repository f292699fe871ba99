pub mod backend;
pub mod client;
pub mod pool;

use thiserror::Error;

/// Errors crossing the proxy boundary
///
/// Never escalated: the gateway router converts every variant into a
/// response code for the single affected request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Establishing the backend session failed
    #[error("backend connect failed: {0}")]
    Connect(String),

    /// A request/response call failed on an established session
    #[error("backend call failed: {0}")]
    Call(String),

    /// The proxy has no established backend session
    #[error("proxy is not connected")]
    NotConnected,

    /// The owning gateway connection was never registered
    #[error("gateway connection has no cid")]
    Unregistered,
}
