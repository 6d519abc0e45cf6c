//! Peer-to-peer networking
//!
//! Line-delimited JSON transport over TCP, the accept loop that feeds the
//! shared peer channel, broadcast fan-out, and the peer-endpoint registry
//! interface.

pub mod peer;
pub mod registry;
pub mod server;

pub use peer::{
    broadcast_block, broadcast_pool, connect_peers, PeerConn, PeerMsg, PeerMsgType,
    READ_BUFFER_SIZE_BYTES,
};
pub use registry::{InMemoryPeerRegistry, PeerInfo, PeerRegistry};
