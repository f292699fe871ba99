//! Stronghold Gateway Core
//!
//! Connection/session registry and message-routing gateway for a multiplayer
//! strategy-game backend. The crate tracks client identity (connection, user,
//! role) through login/logout/reconnect, forwards application messages to the
//! correct backend service (login, chat, gameplay) over per-connection proxy
//! sessions, and fans server-originated events out to the subset of online
//! roles whose viewport covers the affected map position.
//!
//! The transport terminating the wire protocol, the spatial index storing
//! role positions, and the backend services themselves are external
//! collaborators; this crate defines the routing and lifecycle policy over
//! opaque named messages and opaque connection handles.

pub mod config;
pub mod net;
pub mod proxy;
pub mod router;
pub mod telemetry;
