//! Wallet key management and spending
//!
//! Derives the node's address from a private scalar and builds signed
//! transfers against the transaction service.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::{Wallet, WalletInfo};
