//! Core chain and transaction logic
//!
//! Blocks, the chain with its proof-of-work miner and difficulty
//! controller, the transaction model, and the validation rules plus the
//! service that applies them to shared state.

pub mod block;
pub mod blockchain;
pub mod difficulty;
pub mod proof_of_work;
pub mod transaction;
pub mod tx_service;
pub mod validator;

pub use block::Block;
pub use blockchain::{
    genesis_block, is_genesis_block, is_new_block_valid, Blockchain, GENESIS_DATA,
};
pub use difficulty::{BLOCK_GENERATION_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL_BLOCKS};
pub use proof_of_work::ProofOfWork;
pub use transaction::{Transaction, TxIn, TxOut, UnspentTxOut, COINBASE_AMOUNT};
pub use tx_service::TxService;
pub use validator::TxValidator;
