//! Peer job runtime
//!
//! One job per live peer connection: a read-dispatch loop that consumes one
//! message at a time, mutates the shared chain and transaction state, and
//! answers until the peer signals the end of the conversation.

use std::sync::mpsc::Receiver;
use std::thread;

use log::{error, info, warn};

use crate::core::{Blockchain, Transaction, TxService};
use crate::error::Result;
use crate::network::{PeerConn, PeerMsg, PeerMsgType};

/// Drain the shared peer channel, spawning a detached worker per handle.
/// Producers are the accept loop and the broadcast helpers; ownership of a
/// handle transfers to the worker until it re-emits or drops it.
pub fn start_tasks(peer_rx: Receiver<PeerConn>, chain: Blockchain, service: TxService) {
    for mut peer in peer_rx {
        if peer.is_closed() {
            continue;
        }
        let job = PeerJob::new(chain.clone(), service.clone());
        thread::spawn(move || match job.execute(&mut peer) {
            Ok(()) => info!("Peer job complete"),
            Err(e) => error!("Peer job failed: {e}"),
        });
    }
}

/// The per-peer message loop against the shared chain and transaction
/// service.
pub struct PeerJob {
    chain: Blockchain,
    service: TxService,
}

impl PeerJob {
    pub fn new(chain: Blockchain, service: TxService) -> PeerJob {
        PeerJob { chain, service }
    }

    /// Run the loop to completion. The peer is closed on every exit path.
    pub fn execute(&self, peer: &mut PeerConn) -> Result<()> {
        let result = self.message_loop(peer);
        if let Err(e) = peer.close() {
            warn!("Failed to close peer: {e}");
        }
        result
    }

    fn message_loop(&self, peer: &mut PeerConn) -> Result<()> {
        while !peer.is_closed() {
            let msg = match peer.receive()? {
                Some(msg) => msg,
                None => break,
            };
            // An unknown tag terminates the job without a reply
            match msg.kind()? {
                PeerMsgType::Ack => {
                    info!("Received ACK");
                    peer.close()?;
                }
                PeerMsgType::QueryLatest => self.handle_query_latest(peer)?,
                PeerMsgType::QueryAll => self.handle_query_all(peer)?,
                PeerMsgType::ResponseBlockchain => self.handle_response_blockchain(peer, &msg)?,
                PeerMsgType::QueryTransactionPool => self.handle_query_pool(peer)?,
                PeerMsgType::ResponseTransactionPool => self.handle_response_pool(peer, &msg)?,
            }
        }
        Ok(())
    }

    fn handle_query_latest(&self, peer: &mut PeerConn) -> Result<()> {
        let latest = self.chain.latest_block();
        peer.send_response_chain(std::slice::from_ref(&*latest))
    }

    fn handle_query_all(&self, peer: &mut PeerConn) -> Result<()> {
        info!("Sending entire blockchain");
        peer.send_response_chain(&self.chain.block_list())
    }

    fn handle_response_blockchain(&self, peer: &mut PeerConn, msg: &PeerMsg) -> Result<()> {
        let received = msg.blocks()?;
        if received.is_empty() {
            info!("Got zero blocks");
            return peer.send_ack();
        }

        let latest_received = received[received.len() - 1].clone();
        let latest_held = self.chain.latest_block();
        if latest_received.index <= latest_held.index {
            info!("Received chain is not longer than our own chain, doing nothing");
            return peer.send_ack();
        }

        info!(
            "Blockchain possibly behind, we have {} and the peer has {}",
            latest_held.index, latest_received.index
        );
        if latest_held.block_hash == latest_received.prev_block_hash {
            // The received tail extends our chain directly
            if let Err(e) = self.chain.add_block(latest_received.clone()) {
                warn!("Received invalid block: {e}");
            }
            self.apply_block_transactions(&latest_received);
            self.service.mempool_update();
            peer.send_ack()
        } else if received.len() == 1 {
            // One unknown block: ask for the peer's whole chain and let the
            // follow-up response drive the decision
            info!("Querying peer for the entire blockchain");
            peer.send_query_all()
        } else {
            info!("Replacing blockchain with received chain");
            let candidate = Blockchain::from_blocks(received);
            self.chain.replace(&candidate, &self.service);
            peer.send_ack()
        }
    }

    /// Decode a block's payload as a transaction list and fold the entries
    /// we do not already pool into the unspent-output set.
    fn apply_block_transactions(&self, block: &crate::core::Block) {
        let txs: Vec<Transaction> = match serde_json::from_str(&block.data) {
            Ok(txs) => txs,
            Err(e) => {
                warn!("Block data is not a transaction list: {e}");
                return;
            }
        };
        let batch: Vec<Transaction> = txs
            .into_iter()
            .filter(|tx| !self.service.pool_contains(&tx.id))
            .collect();
        if let Err(e) = self.service.process_block_txs(&batch, block.index) {
            warn!("Invalid block transactions: {e}");
        }
    }

    fn handle_query_pool(&self, peer: &mut PeerConn) -> Result<()> {
        peer.send_response_pool(&self.service.pool_txs())
    }

    /// Merge a received pool into ours, then acknowledge whether or not the
    /// merge succeeded.
    fn handle_response_pool(&self, peer: &mut PeerConn, msg: &PeerMsg) -> Result<()> {
        let merge_result = self.merge_received_pool(msg);
        let ack_result = peer.send_ack();
        merge_result.and(ack_result)
    }

    fn merge_received_pool(&self, msg: &PeerMsg) -> Result<()> {
        let txs = msg.transactions()?;
        for tx in txs {
            if self.service.pool_contains(&tx.id) {
                continue;
            }
            if let Err(e) = self.service.validate_tx(&tx) {
                warn!("Invalid transaction received: {e}");
                continue;
            }
            if let Err(e) = self.service.validate_tx_for_mempool(&tx) {
                warn!("Invalid transaction received: {e}");
                continue;
            }
            if let Err(e) = self.service.mempool_add(tx) {
                warn!("Failed to pool received transaction: {e}");
            }
        }
        self.service.mempool_update();
        Ok(())
    }
}
