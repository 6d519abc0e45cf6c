use log::info;
use serde::Serialize;

use crate::core::{Transaction, TxService};
use crate::error::Result;
use crate::utils::{generate_private_key, public_key_of};

/// Address and balance document served to the administrative surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WalletInfo {
    pub address: String,
    pub balance: u64,
}

/// A key pair bound to the transaction service. The address is the
/// hex-encoded uncompressed public key.
pub struct Wallet {
    private_key: String,
    address: String,
    service: TxService,
}

impl Wallet {
    /// Wallet with a freshly generated key.
    pub fn new(service: TxService) -> Result<Wallet> {
        Self::from_private_key(generate_private_key()?, service)
    }

    pub fn from_private_key(private_key: String, service: TxService) -> Result<Wallet> {
        let address = public_key_of(&private_key)?;
        Ok(Wallet {
            private_key,
            address,
            service,
        })
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn balance(&self) -> u64 {
        self.service.balance_of(&self.address)
    }

    pub fn info(&self) -> WalletInfo {
        WalletInfo {
            address: self.address.clone(),
            balance: self.balance(),
        }
    }

    /// Build, sign, and pool a transfer of `amount` to `to`. The returned
    /// transaction is what the caller broadcasts.
    pub fn send_to_address(&self, amount: u64, to: &str) -> Result<Transaction> {
        let (picks, leftover) = self.service.select_utxos_for(amount, &self.address)?;
        let tx_ins = TxService::tx_ins_from(picks);
        let tx_outs = TxService::build_tx_outs(&self.address, to, amount, leftover);
        let tx = self.service.create_tx(tx_ins, tx_outs, &self.private_key)?;
        self.service.mempool_add(tx.clone())?;
        info!("Wallet sent {amount} to {to} in transaction {}", tx.id);
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnspentTxOut;
    use crate::error::NodeError;

    fn funded_wallet(amounts: &[u64]) -> Wallet {
        let private_key = generate_private_key().unwrap();
        let address = public_key_of(&private_key).unwrap();
        let entries = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| UnspentTxOut {
                tx_out_id: format!("seed{i}"),
                tx_out_index: 0,
                address: address.clone(),
                amount: *amount,
            })
            .collect();
        Wallet::from_private_key(private_key, TxService::with_utxos(entries)).unwrap()
    }

    #[test]
    fn test_address_is_derived_public_key() {
        let wallet = funded_wallet(&[]);
        assert_eq!(wallet.address().len(), 130);
        assert!(wallet.address().starts_with("04"));
    }

    #[test]
    fn test_balance_sums_owned_outputs() {
        let wallet = funded_wallet(&[42, 24]);
        assert_eq!(wallet.balance(), 66);
        let info = wallet.info();
        assert_eq!(info.balance, 66);
        assert_eq!(info.address, wallet.address());
    }

    #[test]
    fn test_send_pools_a_signed_transfer() {
        let wallet = funded_wallet(&[42, 24]);
        let to = public_key_of(&generate_private_key().unwrap()).unwrap();

        let tx = wallet.send_to_address(60, &to).unwrap();
        assert_eq!(tx.tx_ins.len(), 2);
        assert!(tx.tx_ins.iter().all(|tx_in| !tx_in.signature.is_empty()));
        assert_eq!(tx.tx_outs[0].address, to);
        assert_eq!(tx.tx_outs[0].amount, 60);
        assert_eq!(tx.tx_outs[1].address, wallet.address());
        assert_eq!(tx.tx_outs[1].amount, 6);
        assert!(wallet.service.pool_contains(&tx.id));
    }

    #[test]
    fn test_send_fails_on_insufficient_funds() {
        let wallet = funded_wallet(&[42]);
        let to = public_key_of(&generate_private_key().unwrap()).unwrap();
        assert!(matches!(
            wallet.send_to_address(60, &to),
            Err(NodeError::InsufficientFunds {
                required: 60,
                available: 42
            })
        ));
    }
}
