use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};
use crate::utils::{public_key_of, sha256_hex, sign_digest};

/// Reward minted by every coinbase transaction.
pub const COINBASE_AMOUNT: u64 = 50;

/// A transaction output: an amount payable to a hex-encoded public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TxOut {
    pub address: String,
    pub amount: u64,
}

/// An output that has been produced and not yet consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnspentTxOut {
    pub tx_out_id: String,
    pub tx_out_index: u64,
    pub address: String,
    pub amount: u64,
}

/// A transaction input: the unspent output it consumes plus an ASN.1 ECDSA
/// signature over the containing transaction's id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TxIn {
    pub unspent_tx_out: UnspentTxOut,
    pub signature: String,
}

impl TxIn {
    /// Unsigned input consuming `utxo`.
    pub fn new(utxo: UnspentTxOut) -> TxIn {
        TxIn {
            unspent_tx_out: utxo,
            signature: String::new(),
        }
    }

    /// Sign this input with `private_key`. The derived public key must equal
    /// the referenced output's address.
    pub fn sign(&mut self, tx_id: &str, private_key: &str) -> Result<()> {
        let public_key = public_key_of(private_key)?;
        if public_key != self.unspent_tx_out.address {
            return Err(NodeError::KeyMismatch(format!(
                "signing key does not own output {}:{}",
                self.unspent_tx_out.tx_out_id, self.unspent_tx_out.tx_out_index
            )));
        }
        self.signature = sign_digest(tx_id, private_key)?;
        Ok(())
    }
}

/// A value transfer: non-empty input and output lists committed by an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    pub id: String,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
}

impl Transaction {
    /// Id: SHA-256 over the concatenated input references followed by the
    /// output address/amount pairs, in declaration order.
    pub fn calc_id(&self) -> String {
        let mut content = String::new();
        for tx_in in &self.tx_ins {
            content.push_str(&tx_in.unspent_tx_out.tx_out_id);
            content.push_str(&tx_in.unspent_tx_out.tx_out_index.to_string());
        }
        for tx_out in &self.tx_outs {
            content.push_str(&tx_out.address);
            content.push_str(&tx_out.amount.to_string());
        }
        sha256_hex(content.as_bytes())
    }

    /// Coinbase for a block: one unsigned input pinned to the block index,
    /// one output minting the reward.
    pub fn new_coinbase(address: &str, block_index: u64) -> Transaction {
        let mut tx = Transaction {
            id: String::new(),
            tx_ins: vec![TxIn {
                unspent_tx_out: UnspentTxOut {
                    tx_out_index: block_index,
                    ..Default::default()
                },
                signature: String::new(),
            }],
            tx_outs: vec![TxOut {
                address: address.to_string(),
                amount: COINBASE_AMOUNT,
            }],
        };
        tx.id = tx.calc_id();
        tx
    }

    pub fn total_out(&self) -> u64 {
        self.tx_outs.iter().map(|tx_out| tx_out.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{generate_private_key, verify_signature};

    fn transfer_tx() -> Transaction {
        let mut tx = Transaction {
            id: String::new(),
            tx_ins: vec![TxIn::new(UnspentTxOut {
                tx_out_id: "moustache".to_string(),
                tx_out_index: 42,
                address: "somewalletaddress".to_string(),
                amount: 99,
            })],
            tx_outs: vec![TxOut {
                address: "somewalletaddress".to_string(),
                amount: 99,
            }],
        };
        tx.id = tx.calc_id();
        tx
    }

    #[test]
    fn test_calc_id_is_a_sha256_digest() {
        let tx = transfer_tx();
        assert_eq!(tx.id.len(), 64);
        assert!(tx.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(tx.calc_id(), tx.id);
    }

    #[test]
    fn test_calc_id_covers_inputs_and_outputs() {
        let base = transfer_tx();

        let mut changed = base.clone();
        changed.tx_ins[0].unspent_tx_out.tx_out_index = 43;
        assert_ne!(changed.calc_id(), base.id);

        let mut changed = base.clone();
        changed.tx_outs[0].amount = 98;
        assert_ne!(changed.calc_id(), base.id);

        // The signature is not part of the id
        let mut changed = base.clone();
        changed.tx_ins[0].signature = "signed by bob ross".to_string();
        assert_eq!(changed.calc_id(), base.id);
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::new_coinbase("miner-address", 7);
        assert_eq!(tx.tx_ins.len(), 1);
        assert_eq!(tx.tx_ins[0].unspent_tx_out.tx_out_index, 7);
        assert!(tx.tx_ins[0].signature.is_empty());
        assert_eq!(tx.tx_outs.len(), 1);
        assert_eq!(tx.tx_outs[0].amount, COINBASE_AMOUNT);
        assert_eq!(tx.id, tx.calc_id());
    }

    #[test]
    fn test_total_out_sums_outputs() {
        let tx = Transaction {
            id: String::new(),
            tx_ins: vec![],
            tx_outs: vec![
                TxOut {
                    address: "a".to_string(),
                    amount: 42,
                },
                TxOut {
                    address: "b".to_string(),
                    amount: 11,
                },
            ],
        };
        assert_eq!(tx.total_out(), 53);
    }

    #[test]
    fn test_sign_requires_owning_key() {
        let key = generate_private_key().unwrap();
        let address = public_key_of(&key).unwrap();
        let digest = sha256_hex(b"tx id stand-in");

        let mut tx_in = TxIn::new(UnspentTxOut {
            tx_out_id: "t".to_string(),
            tx_out_index: 0,
            address,
            amount: 10,
        });
        tx_in.sign(&digest, &key).unwrap();
        assert!(!tx_in.signature.is_empty());
        assert!(verify_signature(
            &digest,
            &tx_in.signature,
            &tx_in.unspent_tx_out.address
        ));

        // A key that does not own the output is refused
        let stranger = generate_private_key().unwrap();
        let mut tx_in = TxIn::new(tx_in.unspent_tx_out.clone());
        assert!(matches!(
            tx_in.sign(&digest, &stranger),
            Err(NodeError::KeyMismatch(_))
        ));
    }

    #[test]
    fn test_wire_field_names() {
        let tx = transfer_tx();
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("Id").is_some());
        let tx_in = &json["TxIns"][0];
        assert!(tx_in.get("Signature").is_some());
        let utxo = &tx_in["UnspentTxOut"];
        for field in ["TxOutId", "TxOutIndex", "Address", "Amount"] {
            assert!(utxo.get(field).is_some(), "missing wire field {field}");
        }
        let tx_out = &json["TxOuts"][0];
        assert!(tx_out.get("Address").is_some());
        assert!(tx_out.get("Amount").is_some());
    }
}
