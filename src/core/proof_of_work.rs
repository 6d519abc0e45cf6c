use log::info;

use crate::core::Block;

const MAX_NONCE: u64 = u64::MAX;

/// Nonce search over an unsealed candidate block.
///
/// The search blocks the caller until the hash carries the required zero
/// prefix; there is no cancellation.
pub struct ProofOfWork {
    block: Block,
}

impl ProofOfWork {
    pub fn new(candidate: Block) -> ProofOfWork {
        ProofOfWork { block: candidate }
    }

    /// Run the search and return the sealed block.
    pub fn run(mut self) -> Block {
        info!(
            "Mining block at index {} with difficulty {}",
            self.block.index, self.block.difficulty
        );
        while self.block.nonce < MAX_NONCE {
            self.block.block_hash = self.block.compute_hash();
            if self.block.has_valid_pow() {
                break;
            }
            self.block.nonce += 1;
        }
        info!(
            "Sealed block {} at nonce {}",
            self.block.block_hash, self.block.nonce
        );
        self.block
    }

    /// Whether a sealed block's hash matches its contents and its claimed
    /// difficulty prefix.
    pub fn validate(block: &Block) -> bool {
        block.block_hash == block.compute_hash() && block.has_valid_pow()
    }
}
