//! Splitting blocks that run too long, hold too much text, or read too fast
//!
//! All three splitters cut the flattened text with [`find_block_split`] and
//! share the time proportionally to the characters on each side, leaving
//! `min_gap_ms` between the halves.

use std::collections::VecDeque;

use tracing::debug;

use super::snap::snap_to_speech_gap;
use super::{Diagnostic, StageOutcome};
use crate::boundary::{find_block_split, split_at_boundary};
use crate::config::{OptimizeConfig, Tunables};
use crate::types::{Block, SpeechTimings};

/// Text halves of a block, already trimmed
struct TextCut {
    left: String,
    right: String,
    /// Share of the flattened text that goes to the left half
    ratio: f64,
}

/// Cut the block's text; `None` when there is no cut or a half has fewer
/// than `min_half` characters
fn cut_text(block: &Block, min_half: usize) -> Option<TextCut> {
    let flat = block.flat_text();
    let pos = find_block_split(&flat)?;
    let (left, right) = split_at_boundary(&flat, pos);
    let left_chars = left.chars().count();
    if left_chars < min_half || right.chars().count() < min_half {
        return None;
    }
    let ratio = left_chars as f64 / flat.chars().count() as f64;
    Some(TextCut { left, right, ratio })
}

fn proportional_mid(block: &Block, ratio: f64) -> i64 {
    block.start_ms + (block.duration_ms() as f64 * ratio) as i64
}

/// Build the two halves around `mid`; `None` if either would be empty in time
fn halves(block: &Block, cut: TextCut, mid: i64, gap: i64) -> Option<(Block, Block)> {
    let left = Block::new(block.ordinal, block.start_ms, mid - gap / 2, cut.left);
    let right = Block::new(block.ordinal, mid + (gap - gap / 2), block.end_ms, cut.right);
    if left.duration_ms() <= 0 || right.duration_ms() <= 0 {
        return None;
    }
    Some((left, right))
}

/// Recursively split blocks longer than `max_duration_ms` plus slack,
/// placing each cut on the nearest pause in the speech when there is one.
pub fn split_by_duration(
    blocks: Vec<Block>,
    config: &OptimizeConfig,
    tunables: &Tunables,
    speech: &SpeechTimings,
) -> StageOutcome {
    const STAGE: &str = "split_duration";
    let limit = config.max_duration_ms + tunables.duration_split_slack_ms;

    let mut pending: VecDeque<Block> = blocks.into();
    let mut done = Vec::with_capacity(pending.len());
    let mut diagnostics = Vec::new();
    let mut splits = 0;

    while let Some(block) = pending.pop_front() {
        if block.duration_ms() <= limit || block.flat_text().chars().count() < tunables.min_split_chars
        {
            done.push(block);
            continue;
        }

        let Some(cut) = cut_text(&block, 3) else {
            diagnostics.push(Diagnostic::new(
                STAGE,
                done.len(),
                &block,
                "too long but no usable text boundary",
            ));
            done.push(block);
            continue;
        };

        let mut mid = proportional_mid(&block, cut.ratio);
        mid = snap_to_speech_gap(mid, block.start_ms, block.end_ms, speech, tunables);
        if mid - block.start_ms < config.min_duration_ms {
            mid = block.start_ms + config.min_duration_ms;
        }
        if block.end_ms - mid < config.min_duration_ms {
            mid = block.end_ms - config.min_duration_ms;
        }

        match halves(&block, cut, mid, config.min_gap_ms) {
            Some((left, right)) => {
                pending.push_front(right);
                pending.push_front(left);
                splits += 1;
            }
            None => {
                diagnostics.push(Diagnostic::new(
                    STAGE,
                    done.len(),
                    &block,
                    "split would leave a half without duration",
                ));
                done.push(block);
            }
        }
    }

    debug!(splits, blocks = done.len(), "duration split");
    StageOutcome::new(done, splits).with_diagnostics(diagnostics)
}

/// Recursively split blocks holding more than `max_chars_block` characters
pub fn split_by_size(blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    const STAGE: &str = "split_size";

    let mut pending: VecDeque<Block> = blocks.into();
    let mut done = Vec::with_capacity(pending.len());
    let mut diagnostics = Vec::new();
    let mut splits = 0;

    while let Some(block) = pending.pop_front() {
        if block.flat_text().chars().count() <= config.max_chars_block {
            done.push(block);
            continue;
        }

        let split = cut_text(&block, tunables.min_split_chars + 1).and_then(|cut| {
            let mid = proportional_mid(&block, cut.ratio);
            halves(&block, cut, mid, config.min_gap_ms)
        });
        match split {
            Some((left, right)) => {
                pending.push_front(right);
                pending.push_front(left);
                splits += 1;
            }
            None => {
                diagnostics.push(Diagnostic::new(
                    STAGE,
                    done.len(),
                    &block,
                    format!(
                        "{} chars exceed block limit and cannot be split",
                        block.char_count()
                    ),
                ));
                done.push(block);
            }
        }
    }

    debug!(splits, blocks = done.len(), "size split");
    StageOutcome::new(done, splits).with_diagnostics(diagnostics)
}

/// Split blocks still above `hard_max_cps`; one pass, halves are not revisited
pub fn split_by_rate(blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    const STAGE: &str = "split_rate";

    let mut out = Vec::with_capacity(blocks.len());
    let mut diagnostics = Vec::new();
    let mut splits = 0;

    for block in blocks {
        if block.cps() <= config.hard_max_cps || block.char_count() <= tunables.rate_split_min_chars {
            out.push(block);
            continue;
        }

        let split = cut_text(&block, tunables.rate_split_min_half + 1).and_then(|cut| {
            let mid = proportional_mid(&block, cut.ratio);
            halves(&block, cut, mid, config.min_gap_ms)
        });
        match split {
            Some((left, right)) => {
                out.push(left);
                out.push(right);
                splits += 1;
            }
            None => {
                diagnostics.push(Diagnostic::new(
                    STAGE,
                    out.len(),
                    &block,
                    format!("{:.1} CPS above hard limit and cannot be split", block.cps()),
                ));
                out.push(block);
            }
        }
    }

    debug!(splits, blocks = out.len(), "rate split");
    StageOutcome::new(out, splits).with_diagnostics(diagnostics)
}
