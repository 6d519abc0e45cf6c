use crate::core::{Transaction, UnspentTxOut};
use crate::error::{NodeError, Result};

/// Insertion-ordered set of unspent outputs.
///
/// Ordering matters: selection scans in insertion order, and applying a
/// block keeps survivors ahead of newly minted outputs.
#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    entries: Vec<UnspentTxOut>,
}

impl UtxoSet {
    pub fn new() -> UtxoSet {
        UtxoSet { entries: vec![] }
    }

    pub fn from_entries(entries: Vec<UnspentTxOut>) -> UtxoSet {
        UtxoSet { entries }
    }

    pub fn entries(&self) -> &[UnspentTxOut] {
        self.entries.as_slice()
    }

    pub fn find(&self, tx_out_id: &str, tx_out_index: u64) -> Option<&UnspentTxOut> {
        self.entries
            .iter()
            .find(|entry| entry.tx_out_id == tx_out_id && entry.tx_out_index == tx_out_index)
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        self.entries
            .iter()
            .filter(|entry| entry.address == address)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Scan in insertion order, accumulating outputs owned by `address`
    /// until the running sum covers `amount`. Returns the picks and the
    /// leftover above the requested amount.
    pub fn select_for_amount(
        &self,
        amount: u64,
        address: &str,
    ) -> Result<(Vec<UnspentTxOut>, u64)> {
        let mut picked = vec![];
        let mut accumulated = 0u64;
        for entry in &self.entries {
            if entry.address != address {
                continue;
            }
            picked.push(entry.clone());
            accumulated += entry.amount;
            if accumulated >= amount {
                return Ok((picked, accumulated - amount));
            }
        }
        Err(NodeError::InsufficientFunds {
            required: amount,
            available: accumulated,
        })
    }

    /// Fold a validated block batch into the set: every consumed output is
    /// removed before any produced output is appended, so a transaction can
    /// never consume an output minted in the same batch.
    pub fn apply(&mut self, batch: &[Transaction]) {
        let consumed: Vec<(&str, u64)> = batch
            .iter()
            .flat_map(|tx| tx.tx_ins.iter())
            .map(|tx_in| {
                (
                    tx_in.unspent_tx_out.tx_out_id.as_str(),
                    tx_in.unspent_tx_out.tx_out_index,
                )
            })
            .collect();
        self.entries.retain(|entry| {
            !consumed
                .iter()
                .any(|(id, index)| *id == entry.tx_out_id && *index == entry.tx_out_index)
        });

        for tx in batch {
            for (index, tx_out) in tx.tx_outs.iter().enumerate() {
                self.entries.push(UnspentTxOut {
                    tx_out_id: tx.id.clone(),
                    tx_out_index: index as u64,
                    address: tx_out.address.clone(),
                    amount: tx_out.amount,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
