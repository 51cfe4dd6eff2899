//! Folding fragments into their neighbors

use tracing::debug;

use super::StageOutcome;
use crate::config::{OptimizeConfig, Tunables};
use crate::types::Block;

const SPARSE_PASSES: usize = 10;
const SHORT_PASSES: usize = 5;

/// A handful of characters spread over far more time than they need
pub fn is_sparse(block: &Block, tunables: &Tunables) -> bool {
    block.char_count() < tunables.sparse_max_chars && block.cps() < tunables.sparse_cps_threshold
}

fn is_short(block: &Block, config: &OptimizeConfig, tunables: &Tunables) -> bool {
    block.duration_ms() < config.min_duration_ms
        || (block.char_count() < tunables.short_text_chars
            && block.duration_ms() < tunables.short_text_max_ms)
        || is_sparse(block, tunables)
}

/// Join two blocks: earlier start, later end, flattened texts with one space
fn join(first: &Block, second: &Block) -> Block {
    let text = format!("{} {}", first.flat_text(), second.flat_text());
    Block::new(
        first.ordinal,
        first.start_ms,
        second.end_ms,
        text.trim().to_string(),
    )
}

fn combined_chars(first: &Block, second: &Block) -> usize {
    first.char_count() + second.char_count() + 1
}

/// Merge sparse blocks forward, or backward when forward does not fit, until
/// nothing merges. Blocks that stay sparse afterwards are cut down to a
/// comfortable reading time.
pub fn merge_sparse(blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    let mut blocks = blocks;
    let mut merged_total = 0;

    for _ in 0..SPARSE_PASSES {
        let mut merged = 0;
        let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
        let mut iter = blocks.into_iter().peekable();

        while let Some(block) = iter.next() {
            if !is_sparse(&block, tunables) {
                out.push(block);
                continue;
            }

            if let Some(next) = iter.peek() {
                if combined_chars(&block, next) <= config.max_chars_block {
                    let joined = join(&block, next);
                    iter.next();
                    out.push(joined);
                    merged += 1;
                    continue;
                }
            }

            if let Some(prev) = out.last_mut() {
                if combined_chars(prev, &block) <= config.max_chars_block {
                    *prev = join(prev, &block);
                    merged += 1;
                    continue;
                }
            }

            out.push(block);
        }

        blocks = out;
        merged_total += merged;
        if merged == 0 {
            break;
        }
    }

    let mut trimmed = 0;
    if merged_total > 0 {
        trimmed = trim_sparse(&mut blocks, config, tunables);
    }

    debug!(merged = merged_total, trimmed, "sparse merge");
    StageOutcome::new(blocks, merged_total + trimmed)
}

/// Shorten blocks below the sparse CPS threshold to
/// `sparse_trim_factor × max(reading time, min_duration_ms)`
fn trim_sparse(blocks: &mut [Block], config: &OptimizeConfig, tunables: &Tunables) -> usize {
    let mut trimmed = 0;
    for i in 0..blocks.len() {
        let next_start = blocks.get(i + 1).map(|next| next.start_ms);
        let block = &mut blocks[i];
        if block.cps() >= tunables.sparse_cps_threshold {
            continue;
        }

        let reading = block.reading_time_ms(config.target_cps).max(config.min_duration_ms);
        let max_duration = (reading as f64 * tunables.sparse_trim_factor) as i64;
        if block.duration_ms() <= max_duration {
            continue;
        }

        let mut end = block.start_ms + max_duration;
        if let Some(next_start) = next_start {
            end = end.min(next_start - config.min_gap_ms);
        }
        end = end.max(block.start_ms + config.min_duration_ms);
        if end < block.end_ms {
            block.end_ms = end;
            trimmed += 1;
        }
    }
    trimmed
}

/// Merge adjacent pairs where either side is short, within character,
/// span and gap limits. Sparse neighbors get looser span and gap limits.
pub fn merge_short(blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    let mut blocks = blocks;
    let mut merged_total = 0;

    for _ in 0..SHORT_PASSES {
        let mut merged = 0;
        let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
        let mut iter = blocks.into_iter().peekable();

        while let Some(block) = iter.next() {
            if let Some(next) = iter.peek() {
                if can_merge_short(&block, next, config, tunables) {
                    let joined = join(&block, next);
                    iter.next();
                    out.push(joined);
                    merged += 1;
                    continue;
                }
            }
            out.push(block);
        }

        blocks = out;
        merged_total += merged;
        if merged == 0 {
            break;
        }
    }

    debug!(merged = merged_total, "short merge");
    StageOutcome::new(blocks, merged_total)
}

fn can_merge_short(
    block: &Block,
    next: &Block,
    config: &OptimizeConfig,
    tunables: &Tunables,
) -> bool {
    if !is_short(block, config, tunables) && !is_short(next, config, tunables) {
        return false;
    }

    let either_sparse = is_sparse(block, tunables) || is_sparse(next, tunables);
    let (max_gap, max_span) = if either_sparse {
        (tunables.sparse_merge_gap_ms, config.max_duration_ms * 2)
    } else {
        (
            tunables.merge_gap_ms,
            config.max_duration_ms + tunables.duration_split_slack_ms,
        )
    };

    combined_chars(block, next) <= config.max_chars_block
        && next.end_ms - block.start_ms <= max_span
        && next.start_ms - block.end_ms < max_gap
}
