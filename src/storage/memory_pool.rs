use log::info;

use crate::core::Transaction;
use crate::storage::UtxoSet;

/// Insertion-ordered pool of validated, not-yet-mined transactions.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    txs: Vec<Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool { txs: vec![] }
    }

    pub fn contains(&self, tx_id: &str) -> bool {
        self.txs.iter().any(|tx| tx.id == tx_id)
    }

    pub fn add(&mut self, tx: Transaction) {
        self.txs.push(tx);
    }

    pub fn txs(&self) -> &[Transaction] {
        self.txs.as_slice()
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.txs.clone()
    }

    /// Retain a transaction while at least one of its inputs still
    /// references a live unspent output; drop the rest. This is what evicts
    /// entries consumed by a newly accepted block.
    pub fn update(&mut self, utxos: &UtxoSet) {
        let before = self.txs.len();
        self.txs.retain(|tx| {
            tx.tx_ins.iter().any(|tx_in| {
                utxos
                    .find(
                        &tx_in.unspent_tx_out.tx_out_id,
                        tx_in.unspent_tx_out.tx_out_index,
                    )
                    .is_some()
            })
        });
        let evicted = before - self.txs.len();
        if evicted > 0 {
            info!("Evicted {evicted} stale transactions from the pool");
        }
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}
