//! Node configuration
//!
//! Resolved once at startup and plumbed explicitly into the components
//! that need it.

use std::env;

use crate::network::PeerInfo;

pub const DEFAULT_TCP_PORT: u16 = 4343;

const TCP_PORT_KEY: &str = "NODE_TCP_PORT";

/// Runtime settings for one node process.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the peer listener binds
    pub tcp_port: u16,
    /// Endpoints registered before the node starts
    pub seed_peers: Vec<PeerInfo>,
}

impl NodeConfig {
    pub fn new(tcp_port: u16, seed_peers: Vec<PeerInfo>) -> NodeConfig {
        NodeConfig {
            tcp_port,
            seed_peers,
        }
    }

    /// Resolve the TCP port: explicit argument, then the `NODE_TCP_PORT`
    /// environment variable, then the default.
    pub fn resolve_port(cli_port: Option<u16>) -> u16 {
        if let Some(port) = cli_port {
            return port;
        }
        if let Ok(raw) = env::var(TCP_PORT_KEY) {
            if let Ok(port) = raw.parse::<u16>() {
                return port;
            }
        }
        DEFAULT_TCP_PORT
    }
}
