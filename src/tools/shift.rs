use anyhow::{bail, ensure, Result};
use similar::TextDiff;

use crate::srt::format_timecode;
use crate::types::Block;

/// Leading blocks that must agree on the offset
const CONSISTENCY_BLOCKS: usize = 10;
const OFFSET_TOLERANCE_MS: i64 = 500;
const MIN_TEXT_SIMILARITY: f32 = 0.98;

/// Constant offset between two timings of the same text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedOffset {
    /// `other` minus `reference`, from the first block's start
    pub offset_ms: i64,
    pub similarity: f32,
}

fn comparable_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .flat_map(|b| b.text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Work out how far `other` is shifted against `reference`. Both tracks must
/// hold the same number of blocks and nearly the same text, and the first
/// blocks must all be shifted by the same amount.
pub fn detect_offset(reference: &[Block], other: &[Block]) -> Result<DetectedOffset> {
    let (Some(first_ref), Some(first_other)) = (reference.first(), other.first()) else {
        bail!("One or both tracks are empty");
    };
    ensure!(
        reference.len() == other.len(),
        "Block count mismatch ({} vs {})",
        reference.len(),
        other.len()
    );

    let reference_text = comparable_text(reference);
    let other_text = comparable_text(other);
    let similarity = TextDiff::from_chars(reference_text.as_str(), other_text.as_str()).ratio();
    ensure!(
        similarity >= MIN_TEXT_SIMILARITY,
        "Text similarity {:.4} below {}",
        similarity,
        MIN_TEXT_SIMILARITY
    );

    let offset_ms = first_other.start_ms - first_ref.start_ms;
    for (i, (a, b)) in reference
        .iter()
        .zip(other)
        .take(CONSISTENCY_BLOCKS)
        .enumerate()
    {
        let block_offset = b.start_ms - a.start_ms;
        ensure!(
            (block_offset - offset_ms).abs() <= OFFSET_TOLERANCE_MS,
            "Inconsistent offset: block {} is shifted by {} ms, expected {} ms",
            i + 1,
            block_offset,
            offset_ms
        );
    }

    Ok(DetectedOffset {
        offset_ms,
        similarity,
    })
}

/// Move every block by `offset_ms`. Fails instead of producing negative
/// timestamps.
pub fn shift_blocks(mut blocks: Vec<Block>, offset_ms: i64) -> Result<Vec<Block>> {
    if let Some(earliest) = blocks.iter().min_by_key(|b| b.start_ms) {
        ensure!(
            earliest.start_ms + offset_ms >= 0,
            "Shifting by {} ms would move block #{} ({}) before zero",
            offset_ms,
            earliest.ordinal,
            format_timecode(earliest.start_ms)
        );
    }
    for block in &mut blocks {
        block.shift(offset_ms);
    }
    Ok(blocks)
}
