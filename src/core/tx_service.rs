use std::sync::{Arc, RwLock};

use log::info;

use crate::core::{Transaction, TxIn, TxOut, TxValidator, UnspentTxOut};
use crate::error::{NodeError, Result};
use crate::storage::{MemoryPool, UtxoSet};

struct TxState {
    utxos: UtxoSet,
    pool: MemoryPool,
}

/// Owns the unspent-output set and the transaction pool behind one lock.
///
/// Clone-able handle; all clones share state. Mutations (block application,
/// pool admission, pool update) serialize on the write lock, readers see a
/// consistent snapshot.
#[derive(Clone)]
pub struct TxService {
    validator: TxValidator,
    inner: Arc<RwLock<TxState>>,
}

impl TxService {
    pub fn new() -> TxService {
        Self::with_utxos(vec![])
    }

    /// Service seeded with an existing unspent-output list.
    pub fn with_utxos(entries: Vec<UnspentTxOut>) -> TxService {
        TxService {
            validator: TxValidator,
            inner: Arc::new(RwLock::new(TxState {
                utxos: UtxoSet::from_entries(entries),
                pool: MemoryPool::new(),
            })),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TxState> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on transaction state")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TxState> {
        self.inner
            .write()
            .expect("Failed to acquire write lock on transaction state")
    }

    pub fn utxos(&self) -> Vec<UnspentTxOut> {
        self.read().utxos.entries().to_vec()
    }

    pub fn pool_txs(&self) -> Vec<Transaction> {
        self.read().pool.snapshot()
    }

    pub fn pool_contains(&self, tx_id: &str) -> bool {
        self.read().pool.contains(tx_id)
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        self.read().utxos.balance_of(address)
    }

    pub fn validate_tx(&self, tx: &Transaction) -> Result<()> {
        let state = self.read();
        self.validator.validate_tx(tx, &state.utxos)
    }

    pub fn validate_tx_for_mempool(&self, tx: &Transaction) -> Result<()> {
        let state = self.read();
        self.validator.validate_tx_for_pool(tx, &state.pool)
    }

    /// Validate a block's transaction batch and, if it passes, fold it into
    /// the unspent-output set. Consumed outputs are removed before produced
    /// outputs are appended.
    pub fn process_block_txs(&self, batch: &[Transaction], block_index: u64) -> Result<()> {
        let mut state = self.write();
        self.validator
            .validate_block_txs(batch, &state.utxos, block_index)?;
        state.utxos.apply(batch);
        info!(
            "Applied {} block transactions at index {block_index}",
            batch.len()
        );
        Ok(())
    }

    /// Admit a transaction to the pool. Rejected when already pooled by id,
    /// invalid on its own, or in conflict with a pooled transaction.
    pub fn mempool_add(&self, tx: Transaction) -> Result<()> {
        let mut state = self.write();
        if state.pool.contains(&tx.id) {
            return Err(NodeError::InvalidTxId(format!(
                "transaction {} is already pooled",
                tx.id
            )));
        }
        self.validator.validate_tx(&tx, &state.utxos)?;
        self.validator.validate_tx_for_pool(&tx, &state.pool)?;
        info!("Admitting transaction {} to the pool", tx.id);
        state.pool.add(tx);
        Ok(())
    }

    /// Purge pooled transactions none of whose inputs reference a live
    /// unspent output.
    pub fn mempool_update(&self) {
        let mut state = self.write();
        let TxState { utxos, pool } = &mut *state;
        pool.update(utxos);
    }

    /// Scan the unspent-output set for `address`, accumulating until the
    /// running sum covers `amount`; returns the picks and the leftover.
    pub fn select_utxos_for(
        &self,
        amount: u64,
        address: &str,
    ) -> Result<(Vec<UnspentTxOut>, u64)> {
        self.read().utxos.select_for_amount(amount, address)
    }

    /// Unsigned inputs consuming the given outputs.
    pub fn tx_ins_from(picks: Vec<UnspentTxOut>) -> Vec<TxIn> {
        picks.into_iter().map(TxIn::new).collect()
    }

    /// Recipient output plus a change output back to the sender when the
    /// selection overshot the amount.
    pub fn build_tx_outs(from: &str, to: &str, amount: u64, leftover: u64) -> Vec<TxOut> {
        let mut tx_outs = vec![TxOut {
            address: to.to_string(),
            amount,
        }];
        if leftover > 0 {
            tx_outs.push(TxOut {
                address: from.to_string(),
                amount: leftover,
            });
        }
        tx_outs
    }

    /// Assemble and sign a transaction: compute the id over the given inputs
    /// and outputs, then sign every input with `private_key`.
    pub fn create_tx(
        &self,
        tx_ins: Vec<TxIn>,
        tx_outs: Vec<TxOut>,
        private_key: &str,
    ) -> Result<Transaction> {
        let mut tx = Transaction {
            id: String::new(),
            tx_ins,
            tx_outs,
        };
        tx.id = tx.calc_id();
        let id = tx.id.clone();
        for tx_in in &mut tx.tx_ins {
            tx_in.sign(&id, private_key)?;
        }
        Ok(tx)
    }
}

impl Default for TxService {
    fn default() -> Self {
        Self::new()
    }
}
