use std::collections::HashSet;

use crate::core::{Transaction, COINBASE_AMOUNT};
use crate::error::{NodeError, Result};
use crate::storage::{MemoryPool, UtxoSet};
use crate::utils::verify_signature;

/// Stateless transaction validation rules.
///
/// The service injects this at construction so tests can exercise the rules
/// against hand-built state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxValidator;

impl TxValidator {
    /// A regular transaction is valid when its id matches its contents,
    /// every input consumes a live unspent output and verifies under that
    /// output's address, and the consumed total equals the produced total.
    pub fn validate_tx(&self, tx: &Transaction, utxos: &UtxoSet) -> Result<()> {
        if tx.calc_id() != tx.id {
            return Err(NodeError::InvalidTxId(format!(
                "stored id {} does not match transaction contents",
                tx.id
            )));
        }

        let mut total_in = 0u64;
        for tx_in in &tx.tx_ins {
            let referenced = utxos
                .find(
                    &tx_in.unspent_tx_out.tx_out_id,
                    tx_in.unspent_tx_out.tx_out_index,
                )
                .ok_or_else(|| {
                    NodeError::UtxoNotFound(format!(
                        "referenced output {}:{} is not unspent",
                        tx_in.unspent_tx_out.tx_out_id, tx_in.unspent_tx_out.tx_out_index
                    ))
                })?;
            if !verify_signature(&tx.id, &tx_in.signature, &referenced.address) {
                return Err(NodeError::InvalidSignature(format!(
                    "input {}:{} does not verify under its output address",
                    tx_in.unspent_tx_out.tx_out_id, tx_in.unspent_tx_out.tx_out_index
                )));
            }
            total_in += referenced.amount;
        }

        if total_in != tx.total_out() {
            return Err(NodeError::AmountMismatch(format!(
                "total in {total_in} does not equal total out {}",
                tx.total_out()
            )));
        }
        Ok(())
    }

    /// Coinbase rules: matching id, exactly one input whose output index
    /// equals the block index, exactly one output of the fixed reward. The
    /// input carries no signature and none is checked.
    pub fn validate_coinbase(&self, tx: &Transaction, block_index: u64) -> Result<()> {
        if tx.calc_id() != tx.id {
            return Err(NodeError::InvalidTxId(format!(
                "stored coinbase id {} does not match transaction contents",
                tx.id
            )));
        }
        if tx.tx_ins.len() != 1 {
            return Err(NodeError::InvalidCoinbase(
                "coinbase must have exactly one input".to_string(),
            ));
        }
        if tx.tx_ins[0].unspent_tx_out.tx_out_index != block_index {
            return Err(NodeError::InvalidCoinbase(format!(
                "coinbase input index {} must equal block index {block_index}",
                tx.tx_ins[0].unspent_tx_out.tx_out_index
            )));
        }
        if tx.tx_outs.len() != 1 {
            return Err(NodeError::InvalidCoinbase(
                "coinbase must have exactly one output".to_string(),
            ));
        }
        if tx.tx_outs[0].amount != COINBASE_AMOUNT {
            return Err(NodeError::InvalidCoinbase(format!(
                "coinbase amount {} must equal {COINBASE_AMOUNT}",
                tx.tx_outs[0].amount
            )));
        }
        Ok(())
    }

    /// Whether two inputs anywhere in the batch spend from the same
    /// transaction. Keyed by the spent transaction id.
    pub fn contains_duplicate_inputs(&self, batch: &[Transaction]) -> bool {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut total = 0usize;
        for tx in batch {
            for tx_in in &tx.tx_ins {
                seen.insert(tx_in.unspent_tx_out.tx_out_id.as_str());
                total += 1;
            }
        }
        seen.len() < total
    }

    /// A block's transaction batch: a valid coinbase first, no duplicate
    /// inputs anywhere, and every remaining transaction valid on its own.
    pub fn validate_block_txs(
        &self,
        batch: &[Transaction],
        utxos: &UtxoSet,
        block_index: u64,
    ) -> Result<()> {
        let coinbase = batch.first().ok_or_else(|| {
            NodeError::InvalidCoinbase("block transaction batch is empty".to_string())
        })?;
        self.validate_coinbase(coinbase, block_index)?;

        if self.contains_duplicate_inputs(batch) {
            return Err(NodeError::DuplicateInput(
                "transaction batch spends from the same transaction twice".to_string(),
            ));
        }

        for tx in &batch[1..] {
            self.validate_tx(tx, utxos)?;
        }
        Ok(())
    }

    /// A pool candidate must not consume any output already consumed by a
    /// pooled transaction.
    pub fn validate_tx_for_pool(&self, tx: &Transaction, pool: &MemoryPool) -> Result<()> {
        for pooled in pool.txs() {
            for pooled_in in &pooled.tx_ins {
                for tx_in in &tx.tx_ins {
                    if tx_in.unspent_tx_out.tx_out_id == pooled_in.unspent_tx_out.tx_out_id
                        && tx_in.unspent_tx_out.tx_out_index
                            == pooled_in.unspent_tx_out.tx_out_index
                    {
                        return Err(NodeError::DuplicateInput(format!(
                            "output {}:{} is already consumed by pooled transaction {}",
                            tx_in.unspent_tx_out.tx_out_id,
                            tx_in.unspent_tx_out.tx_out_index,
                            pooled.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
