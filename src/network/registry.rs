use std::sync::RwLock;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};

/// A known peer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerInfo {
    pub ip: String,
    pub port: u16,
}

impl PeerInfo {
    pub fn new(ip: &str, port: u16) -> PeerInfo {
        PeerInfo {
            ip: ip.to_string(),
            port,
        }
    }

    /// Parse an `ip:port` endpoint string.
    pub fn parse(endpoint: &str) -> Result<PeerInfo> {
        let (ip, port) = endpoint.rsplit_once(':').ok_or_else(|| {
            NodeError::Decode(format!("peer endpoint {endpoint} is not ip:port"))
        })?;
        if ip.is_empty() {
            return Err(NodeError::Decode(format!(
                "peer endpoint {endpoint} has an empty host"
            )));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| NodeError::Decode(format!("invalid peer port in {endpoint}: {e}")))?;
        Ok(PeerInfo::new(ip, port))
    }
}

/// Lookup of known peer endpoints, keyed uniquely by ip.
///
/// The store itself is an external collaborator; the node consumes it
/// through this interface.
pub trait PeerRegistry: Send + Sync {
    fn list_peers(&self) -> Vec<PeerInfo>;
    fn upsert_peer(&self, ip: &str, port: u16);
}

/// Default in-memory registry.
pub struct InMemoryPeerRegistry {
    inner: RwLock<Vec<PeerInfo>>,
}

impl Default for InMemoryPeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPeerRegistry {
    pub fn new() -> InMemoryPeerRegistry {
        InMemoryPeerRegistry {
            inner: RwLock::new(vec![]),
        }
    }
}

impl PeerRegistry for InMemoryPeerRegistry {
    fn list_peers(&self) -> Vec<PeerInfo> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on the peer registry")
            .to_vec()
    }

    fn upsert_peer(&self, ip: &str, port: u16) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on the peer registry");
        if let Some(existing) = inner.iter_mut().find(|peer| peer.ip == ip) {
            existing.port = port;
        } else {
            inner.push(PeerInfo::new(ip, port));
        }
        info!("Registered peer {ip}:{port}");
    }
}
