use std::sync::{Arc, RwLock};

use log::info;
use once_cell::sync::Lazy;

use crate::core::difficulty::{adjusted_difficulty, DIFFICULTY_ADJUSTMENT_INTERVAL_BLOCKS};
use crate::core::{Block, ProofOfWork, TxService};
use crate::error::{NodeError, Result};

pub const GENESIS_DATA: &str = "Genesis";

/// The fixed first block. Its hash is the hardcoded all-zero string and its
/// timestamp is captured once at first use; every chain in this process
/// shares this one instance, and genesis checks compare by reference.
static GENESIS_BLOCK: Lazy<Arc<Block>> = Lazy::new(|| {
    Arc::new(Block {
        timestamp: chrono::Utc::now(),
        data: GENESIS_DATA.to_string(),
        prev_block_hash: String::new(),
        block_hash: "0".repeat(64),
        index: 0,
        nonce: 0,
        difficulty: 1,
    })
});

pub fn genesis_block() -> Arc<Block> {
    Arc::clone(&GENESIS_BLOCK)
}

/// Reference identity: a copy with equal field values is not genesis.
pub fn is_genesis_block(block: &Arc<Block>) -> bool {
    Arc::ptr_eq(block, &GENESIS_BLOCK)
}

/// Predicates for appending `new_block` after `prev_block`. Fails with the
/// first violated condition.
pub fn is_new_block_valid(new_block: &Block, prev_block: &Block) -> Result<()> {
    if new_block.index != prev_block.index + 1 {
        return Err(NodeError::InvalidIndex(format!(
            "expected {}, got {}",
            prev_block.index + 1,
            new_block.index
        )));
    }
    if new_block.prev_block_hash != prev_block.block_hash {
        return Err(NodeError::InvalidPrevHash(format!(
            "block {} does not reference the tail's hash",
            new_block.index
        )));
    }
    if new_block.block_hash != new_block.compute_hash() {
        return Err(NodeError::InvalidBlockHash(format!(
            "stored hash {} does not match block contents",
            new_block.block_hash
        )));
    }
    Ok(())
}

/// The ordered sequence of blocks, rooted at the shared genesis instance.
///
/// Clone-able handle over one lock: concurrent readers see a consistent
/// snapshot, mutations (append, replace) serialize on the write lock.
#[derive(Clone)]
pub struct Blockchain {
    blocks: Arc<RwLock<Vec<Arc<Block>>>>,
}

impl Blockchain {
    pub fn new() -> Blockchain {
        Blockchain {
            blocks: Arc::new(RwLock::new(vec![genesis_block()])),
        }
    }

    /// Candidate chain built from a received block list. A head block whose
    /// hash matches the genesis hash is canonicalized to the shared genesis
    /// instance, so a fully valid peer chain can pass the reference check.
    pub fn from_blocks(blocks: Vec<Block>) -> Blockchain {
        let genesis = genesis_block();
        let chain = blocks
            .into_iter()
            .enumerate()
            .map(|(position, block)| {
                if position == 0 && block.block_hash == genesis.block_hash {
                    Arc::clone(&genesis)
                } else {
                    Arc::new(block)
                }
            })
            .collect();
        Blockchain {
            blocks: Arc::new(RwLock::new(chain)),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Block>>> {
        self.blocks
            .read()
            .expect("Failed to acquire read lock on the chain")
    }

    pub fn latest_block(&self) -> Arc<Block> {
        Arc::clone(self.read().last().expect("Chain is never empty"))
    }

    /// Snapshot of the chain, genesis first.
    pub fn blocks(&self) -> Vec<Arc<Block>> {
        self.read().clone()
    }

    /// Owned copies for the wire.
    pub fn block_list(&self) -> Vec<Block> {
        self.read().iter().map(|block| (**block).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Mine a candidate carrying `data` on top of the current tail at the
    /// current difficulty. Blocks the caller until a nonce is found; the
    /// sealed block is returned, not appended.
    pub fn mine_block(&self, data: &str) -> Block {
        let latest = self.latest_block();
        let candidate = Block::new_candidate(
            latest.index + 1,
            data.to_string(),
            latest.block_hash.clone(),
            self.difficulty(),
        );
        ProofOfWork::new(candidate).run()
    }

    /// Append after validating against the tail.
    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut blocks = self
            .blocks
            .write()
            .expect("Failed to acquire write lock on the chain");
        let latest = blocks.last().expect("Chain is never empty");
        is_new_block_valid(&block, latest)?;
        info!("Appending block {} at index {}", block.block_hash, block.index);
        blocks.push(Arc::new(block));
        Ok(())
    }

    /// Difficulty for the next candidate: re-evaluated on adjustment
    /// boundaries, otherwise the tail's difficulty.
    pub fn difficulty(&self) -> u32 {
        let latest = self.latest_block();
        if latest.index != 0 && latest.index % DIFFICULTY_ADJUSTMENT_INTERVAL_BLOCKS == 0 {
            self.adjusted_difficulty()
        } else {
            latest.difficulty
        }
    }

    /// Compare the last adjustment window against the expected block
    /// spacing. The reference block is N positions before the tail, clamped
    /// at genesis.
    pub fn adjusted_difficulty(&self) -> u32 {
        let blocks = self.read();
        let latest = blocks.last().expect("Chain is never empty");
        let back = DIFFICULTY_ADJUSTMENT_INTERVAL_BLOCKS as usize;
        let prev_adjustment = &blocks[blocks.len().saturating_sub(back + 1)];
        adjusted_difficulty(latest, prev_adjustment)
    }

    /// Total proof-of-work: Σ 2^difficulty over all blocks.
    pub fn cumulative_work(&self) -> f64 {
        self.read()
            .iter()
            .map(|block| 2f64.powi(block.difficulty as i32))
            .sum()
    }

    /// Walk the chain: every adjacent pair must satisfy the append
    /// predicates and the walk must terminate at the genesis instance.
    pub fn is_valid(&self) -> bool {
        let blocks = self.read();
        for pair in blocks.windows(2) {
            if is_new_block_valid(&pair[1], &pair[0]).is_err() {
                return false;
            }
        }
        is_genesis_block(&blocks[0])
    }

    /// Longest-cumulative-work replacement: adopt `candidate`'s blocks when
    /// it is fully valid and carries strictly more work, then drop pool
    /// entries the new chain invalidated. Returns whether it replaced.
    pub fn replace(&self, candidate: &Blockchain, service: &TxService) -> bool {
        if candidate.is_valid() && candidate.cumulative_work() > self.cumulative_work() {
            info!("Received blockchain is valid, replacing the current chain");
            let new_blocks = candidate.blocks();
            *self
                .blocks
                .write()
                .expect("Failed to acquire write lock on the chain") = new_blocks;
            service.mempool_update();
            true
        } else {
            info!("Received blockchain rejected");
            false
        }
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_chain_is_just_genesis() {
        let chain = Blockchain::new();
        let tail = chain.latest_block();
        assert_eq!(tail.index, 0);
        assert_eq!(tail.prev_block_hash, "");
        assert_eq!(tail.block_hash, "0".repeat(64));
        assert_eq!(tail.difficulty, 1);
        assert_eq!(chain.len(), 1);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_genesis_identity_is_by_reference() {
        let chain = Blockchain::new();
        let tail = chain.latest_block();
        assert!(is_genesis_block(&tail));

        let copy = Arc::new((*tail).clone());
        assert_eq!(*copy, *tail);
        assert!(!is_genesis_block(&copy));
    }

    #[test]
    fn test_mine_then_append() {
        let chain = Blockchain::new();
        let block = chain.mine_block("hello");

        assert_eq!(block.index, 1);
        assert_eq!(block.prev_block_hash, "0".repeat(64));
        assert!(block.block_hash.starts_with('0'));
        assert_eq!(block.data, "hello");

        chain.add_block(block.clone()).unwrap();
        assert_eq!(*chain.latest_block(), block);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_add_block_fails_with_first_violated_predicate() {
        let chain = Blockchain::new();
        let block = chain.mine_block("hello");

        let mut bad = block.clone();
        bad.index = 42;
        assert!(matches!(
            chain.add_block(bad),
            Err(NodeError::InvalidIndex(_))
        ));

        let mut bad = block.clone();
        bad.prev_block_hash = "invalid".to_string();
        assert!(matches!(
            chain.add_block(bad),
            Err(NodeError::InvalidPrevHash(_))
        ));

        let mut bad = block;
        bad.block_hash = "invalid".to_string();
        assert!(matches!(
            chain.add_block(bad),
            Err(NodeError::InvalidBlockHash(_))
        ));

        assert_eq!(chain.len(), 1, "nothing was appended");
    }

    #[test]
    fn test_tampered_data_breaks_the_walk() {
        let chain = Blockchain::new();
        chain.add_block(chain.mine_block("one")).unwrap();
        chain.add_block(chain.mine_block("two")).unwrap();
        chain.add_block(chain.mine_block("three")).unwrap();
        assert!(chain.is_valid());

        let mut blocks = chain.block_list();
        blocks[2].data = "fake!".to_string();
        let tampered = Blockchain::from_blocks(blocks);
        assert!(!tampered.is_valid());
    }

    #[test]
    fn test_chain_not_rooted_at_genesis_is_invalid() {
        // A forged head with internally consistent links: every adjacent
        // pair validates, but the walk does not terminate at the genesis
        // instance.
        let forged_head = Block {
            timestamp: chrono::Utc::now(),
            data: "forged genesis".to_string(),
            prev_block_hash: String::new(),
            block_hash: format!("1{}", "0".repeat(63)),
            index: 0,
            nonce: 0,
            difficulty: 1,
        };
        let next = ProofOfWork::new(Block::new_candidate(
            1,
            "built on the forgery".to_string(),
            forged_head.block_hash.clone(),
            1,
        ))
        .run();
        let forged = Blockchain::from_blocks(vec![forged_head, next.clone()]);
        assert!(is_new_block_valid(&next, &forged.blocks()[0]).is_ok());
        assert!(!forged.is_valid());
    }

    #[test]
    fn test_from_blocks_canonicalizes_received_genesis() {
        let chain = Blockchain::new();
        chain.add_block(chain.mine_block("one")).unwrap();

        // Wire round trip produces copies of every block
        let wire = serde_json::to_string(&chain.block_list()).unwrap();
        let received: Vec<Block> = serde_json::from_str(&wire).unwrap();
        let candidate = Blockchain::from_blocks(received);
        assert!(candidate.is_valid());
    }

    #[test]
    fn test_cumulative_work() {
        // Chain [d=1, d=1, d=2, d=3]: genesis plus three appended blocks
        let chain = Blockchain::new();
        let blocks = [
            ("one", 1u32),
            ("two", 2u32),
            ("three", 3u32),
        ];
        let mut prev = chain.latest_block();
        for (data, difficulty) in blocks {
            let candidate = Block::new_candidate(
                prev.index + 1,
                data.to_string(),
                prev.block_hash.clone(),
                difficulty,
            );
            let sealed = ProofOfWork::new(candidate).run();
            chain.add_block(sealed).unwrap();
            prev = chain.latest_block();
        }
        assert_eq!(chain.cumulative_work(), 16.0);
    }

    #[test]
    fn test_difficulty_between_boundaries_echoes_tail() {
        let chain = Blockchain::new();
        assert_eq!(chain.difficulty(), 1);
        for i in 0..3 {
            chain.add_block(chain.mine_block(&i.to_string())).unwrap();
            assert_eq!(chain.difficulty(), 1);
        }
    }

    #[test]
    fn test_replace_prefers_strictly_more_work() {
        let ours = Blockchain::new();
        ours.add_block(ours.mine_block("ours")).unwrap();

        let theirs = Blockchain::new();
        theirs.add_block(theirs.mine_block("theirs one")).unwrap();
        theirs.add_block(theirs.mine_block("theirs two")).unwrap();

        let service = TxService::new();
        assert!(ours.replace(&theirs, &service));
        assert_eq!(ours.latest_block().index, 2);
        assert_eq!(ours.latest_block().data, "theirs two");

        // Equal work is not enough
        let equal = Blockchain::new();
        equal.add_block(equal.mine_block("a")).unwrap();
        equal.add_block(equal.mine_block("b")).unwrap();
        assert!(!ours.replace(&equal, &service));

        // An invalid chain never replaces, however heavy
        let mut blocks = theirs.block_list();
        blocks.push(blocks.last().unwrap().clone());
        let invalid = Blockchain::from_blocks(blocks);
        assert!(!ours.replace(&invalid, &service));
    }
}
