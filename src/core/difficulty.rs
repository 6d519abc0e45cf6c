use crate::core::Block;

/// Difficulty is re-evaluated every N blocks.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL_BLOCKS: u64 = 5;
/// Target average spacing between blocks, in seconds.
pub const BLOCK_GENERATION_INTERVAL_SECS: f64 = 0.5;

const MIN_DIFFICULTY: u32 = 1;

/// Adjusted difficulty for the window ending at `latest`.
///
/// `prev_adjustment` is the block N positions before the tail. Faster than
/// half the expected window raises difficulty by one; slower than double
/// lowers it by one, never below the floor.
pub fn adjusted_difficulty(latest: &Block, prev_adjustment: &Block) -> u32 {
    let expected_secs =
        BLOCK_GENERATION_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL_BLOCKS as f64;
    let taken_secs = latest
        .timestamp
        .signed_duration_since(prev_adjustment.timestamp)
        .num_milliseconds() as f64
        / 1000.0;

    if taken_secs < expected_secs / 2.0 {
        prev_adjustment.difficulty + 1
    } else if taken_secs > expected_secs * 2.0 && prev_adjustment.difficulty > MIN_DIFFICULTY {
        prev_adjustment.difficulty - 1
    } else {
        prev_adjustment.difficulty
    }
}
