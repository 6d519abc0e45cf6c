use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::Sender;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::{Block, Transaction};
use crate::error::{NodeError, Result};
use crate::network::registry::PeerRegistry;

/// Socket reads are buffered in chunks of this size.
pub const READ_BUFFER_SIZE_BYTES: usize = 1024;

/// Protocol message tags. The integer values are the wire encoding and must
/// never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerMsgType {
    /// Signals the end of a conversation with a peer
    Ack,
    /// Asks for the latest block a peer holds
    QueryLatest,
    /// Asks for the entire blockchain a peer holds
    QueryAll,
    /// Carries a single block or an entire blockchain
    ResponseBlockchain,
    /// Asks a peer for its transaction pool
    QueryTransactionPool,
    /// Carries a list of pending transactions
    ResponseTransactionPool,
}

impl PeerMsgType {
    pub fn tag(self) -> u8 {
        match self {
            PeerMsgType::Ack => 0,
            PeerMsgType::QueryLatest => 1,
            PeerMsgType::QueryAll => 2,
            PeerMsgType::ResponseBlockchain => 3,
            PeerMsgType::QueryTransactionPool => 4,
            PeerMsgType::ResponseTransactionPool => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Result<PeerMsgType> {
        match tag {
            0 => Ok(PeerMsgType::Ack),
            1 => Ok(PeerMsgType::QueryLatest),
            2 => Ok(PeerMsgType::QueryAll),
            3 => Ok(PeerMsgType::ResponseBlockchain),
            4 => Ok(PeerMsgType::QueryTransactionPool),
            5 => Ok(PeerMsgType::ResponseTransactionPool),
            _ => Err(NodeError::UnknownMessageTag(tag)),
        }
    }
}

/// Wire envelope: a tag plus a lazily decoded inner payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMsg {
    #[serde(rename = "Type")]
    pub msg_type: u8,
    #[serde(rename = "Data", default)]
    pub data: Vec<u8>,
}

impl PeerMsg {
    pub fn new(kind: PeerMsgType, data: Vec<u8>) -> PeerMsg {
        PeerMsg {
            msg_type: kind.tag(),
            data,
        }
    }

    pub fn kind(&self) -> Result<PeerMsgType> {
        PeerMsgType::from_tag(self.msg_type)
    }

    /// Decode the payload as a block list.
    pub fn blocks(&self) -> Result<Vec<Block>> {
        Ok(serde_json::from_slice(&self.data)?)
    }

    /// Decode the payload as a transaction list.
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

/// A live peer connection: newline-framed JSON over a TCP stream.
pub struct PeerConn {
    stream: TcpStream,
    closed: bool,
    carry: Vec<u8>,
}

impl PeerConn {
    pub fn new(stream: TcpStream) -> PeerConn {
        PeerConn {
            stream,
            closed: false,
            carry: Vec::new(),
        }
    }

    /// Shut the connection down. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes of the next frame, up to but excluding the first newline.
    /// `Ok(None)` on a clean end-of-stream at a frame boundary.
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(newline) = self.carry.iter().position(|&b| b == b'\n') {
                let mut frame: Vec<u8> = self.carry.drain(..=newline).collect();
                frame.pop();
                return Ok(Some(frame));
            }
            let mut buf = [0u8; READ_BUFFER_SIZE_BYTES];
            let received = self.stream.read(&mut buf)?;
            if received == 0 {
                if self.carry.is_empty() {
                    return Ok(None);
                }
                return Err(NodeError::Decode(
                    "connection closed mid-frame".to_string(),
                ));
            }
            self.carry.extend_from_slice(&buf[..received]);
        }
    }

    /// Next message from the peer, or `None` when the peer closed the
    /// stream gracefully.
    pub fn receive(&mut self) -> Result<Option<PeerMsg>> {
        let frame = match self.read_frame()? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        let msg = serde_json::from_slice(&frame)?;
        Ok(Some(msg))
    }

    /// Write one envelope as a single newline-terminated JSON line.
    pub fn send(&mut self, msg: &PeerMsg) -> Result<()> {
        let mut encoded = serde_json::to_vec(msg)?;
        encoded.push(b'\n');
        self.stream.write_all(&encoded)?;
        Ok(())
    }

    pub fn send_response_chain(&mut self, blocks: &[Block]) -> Result<()> {
        let data = serde_json::to_vec(blocks)?;
        self.send(&PeerMsg::new(PeerMsgType::ResponseBlockchain, data))
    }

    pub fn send_response_pool(&mut self, txs: &[Transaction]) -> Result<()> {
        let data = serde_json::to_vec(txs)?;
        self.send(&PeerMsg::new(PeerMsgType::ResponseTransactionPool, data))
    }

    pub fn send_query_all(&mut self) -> Result<()> {
        self.send(&PeerMsg::new(PeerMsgType::QueryAll, vec![]))
    }

    pub fn send_query_pool(&mut self) -> Result<()> {
        self.send(&PeerMsg::new(PeerMsgType::QueryTransactionPool, vec![]))
    }

    pub fn send_ack(&mut self) -> Result<()> {
        self.send(&PeerMsg::new(PeerMsgType::Ack, vec![]))
    }
}

/// Dial every registered endpoint; unreachable peers are logged and
/// skipped.
pub fn connect_peers(registry: &dyn PeerRegistry) -> Vec<PeerConn> {
    let mut peers = Vec::new();
    for info in registry.list_peers() {
        match TcpStream::connect((info.ip.as_str(), info.port)) {
            Ok(stream) => peers.push(PeerConn::new(stream)),
            Err(e) => warn!("Could not connect to peer {}:{}: {e}", info.ip, info.port),
        }
    }
    peers
}

/// Send a freshly accepted block to every peer. Each peer that took the
/// message is put back on the shared channel so the runtime continues the
/// conversation; failed peers are logged and dropped.
pub fn broadcast_block(block: &Block, peers: Vec<PeerConn>, peer_tx: &Sender<PeerConn>) {
    info!("Sending block {} to peers", block.index);
    for mut peer in peers {
        match peer.send_response_chain(std::slice::from_ref(block)) {
            Ok(()) => {
                if peer_tx.send(peer).is_err() {
                    warn!("Peer channel is closed, dropping peer");
                }
            }
            Err(e) => warn!("Failed to send block to peer: {e}"),
        }
    }
}

/// Same fan-out for the transaction pool.
pub fn broadcast_pool(pool: &[Transaction], peers: Vec<PeerConn>, peer_tx: &Sender<PeerConn>) {
    info!("Sending {} pooled transactions to peers", pool.len());
    for mut peer in peers {
        match peer.send_response_pool(pool) {
            Ok(()) => {
                if peer_tx.send(peer).is_err() {
                    warn!("Peer channel is closed, dropping peer");
                }
            }
            Err(e) => warn!("Failed to send transaction pool to peer: {e}"),
        }
    }
}
