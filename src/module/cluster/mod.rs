///! Cluster acquisition: a persistent telnet-style client with login
///! handshake, keepalive, reconnect backoff and endpoint failover.

mod client;
pub mod endpoints;
pub mod failover;
pub mod login;
pub mod transport;

pub use client::{ClusterClient, ConnectionState};
pub use endpoints::{Endpoint, EndpointRing};
pub use failover::{FailoverPolicy, ReconnectPlan};
pub use transport::{ClusterTransport, ReadOutcome, TcpTransport, TransportError};
