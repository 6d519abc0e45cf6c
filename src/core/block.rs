use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::sha256_hex;

/// A sealed block commits its payload through a proof-of-work hash.
///
/// Wire field names follow the peer protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub timestamp: DateTime<Utc>,
    pub data: String,
    pub prev_block_hash: String,
    pub block_hash: String,
    pub index: u64,
    pub nonce: u64,
    pub difficulty: u32,
}

impl Block {
    /// Unsealed candidate for the miner: empty hash, nonce 0, stamped now.
    pub fn new_candidate(
        index: u64,
        data: String,
        prev_block_hash: String,
        difficulty: u32,
    ) -> Block {
        Block {
            timestamp: Utc::now(),
            data,
            prev_block_hash,
            block_hash: String::new(),
            index,
            nonce: 0,
            difficulty,
        }
    }

    /// Header fields joined by tabs, with the hash slot rendered empty (the
    /// unsealed state), followed by the decimal nonce. Every node must
    /// produce these bytes identically or hashes diverge.
    fn hash_preimage(&self) -> String {
        format!(
            "{}\t{}\t{}\t\t{}\t{}{}",
            format_timestamp(&self.timestamp),
            self.data,
            self.prev_block_hash,
            self.index,
            self.difficulty,
            self.nonce
        )
    }

    pub fn compute_hash(&self) -> String {
        sha256_hex(self.hash_preimage().as_bytes())
    }

    /// Proof-of-work predicate: the hash must carry `difficulty` leading
    /// ASCII '0' characters.
    pub fn has_valid_pow(&self) -> bool {
        let prefix_len = self.difficulty as usize;
        if self.block_hash.len() < prefix_len {
            return false;
        }
        self.block_hash.as_bytes()[..prefix_len]
            .iter()
            .all(|&b| b == b'0')
    }
}

/// ISO-8601 with nanosecond precision and an explicit UTC offset.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.9f%:z").to_string()
}
