//! # emberchain
//!
//! A minimal proof-of-work cryptocurrency node. The node keeps a local
//! append-only chain of blocks committing ECDSA-signed value transfers over
//! an unspent-output model, mines at an adaptively tuned difficulty, and
//! synchronizes its chain and transaction pool with peers over a framed TCP
//! protocol.
//!
//! ## Layout
//! - `core/`: blocks, the chain with its miner and difficulty controller,
//!   transactions, validation rules, and the transaction service
//! - `storage/`: the unspent-output set and the transaction pool
//! - `wallet/`: key management and spending
//! - `network/`: peer transport, the accept loop, broadcast helpers, and
//!   the peer-endpoint registry interface
//! - `task/`: the per-peer message loop driving synchronization
//! - `config/`, `cli/`: startup settings and argument parsing
//! - `utils/`: hashing and ECDSA helpers
//!
//! The chain and the transaction service are clone-able handles over shared
//! state; the runtime spawns one worker per peer conversation and every
//! worker operates on the same two aggregates.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod task;
pub mod utils;
pub mod wallet;

pub use cli::Opt;
pub use config::{NodeConfig, DEFAULT_TCP_PORT};
pub use core::{
    genesis_block, is_genesis_block, Block, Blockchain, Transaction, TxIn, TxOut, TxService,
    TxValidator, UnspentTxOut, COINBASE_AMOUNT,
};
pub use error::{NodeError, Result};
pub use network::{
    broadcast_block, broadcast_pool, connect_peers, InMemoryPeerRegistry, PeerConn, PeerInfo,
    PeerMsg, PeerMsgType, PeerRegistry,
};
pub use storage::{MemoryPool, UtxoSet};
pub use task::{start_tasks, PeerJob};
pub use wallet::{Wallet, WalletInfo};
