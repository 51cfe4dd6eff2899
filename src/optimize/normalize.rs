//! Whitespace cleanup and gap repair

use tracing::debug;

use super::{Diagnostic, StageOutcome};
use crate::config::OptimizeConfig;
use crate::types::Block;

const STAGE: &str = "normalize";

/// Collapse space runs and trim every line; blank lines are dropped
pub fn normalize_text(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whitespace cleanup followed by [`repair_gaps`], which may move the start
/// of a block that collides with its predecessor
pub fn normalize(mut blocks: Vec<Block>, config: &OptimizeConfig) -> StageOutcome {
    let mut changed = 0;
    for block in &mut blocks {
        let text = normalize_text(&block.text);
        if text != block.text {
            block.text = text;
            changed += 1;
        }
    }

    let mut outcome = StageOutcome::new(Vec::new(), changed);
    outcome.absorb(repair_gaps(blocks, config));
    outcome
}

/// Shrink earlier blocks so every gap is at least `min_gap_ms`.
///
/// When shrinking would leave the earlier block with no duration, it keeps
/// `min_duration_ms` and the next block's `start_ms` is moved forward to
/// `end + min_gap_ms` instead (its end too, if it would be overtaken). Every
/// moved start is reported as a diagnostic.
pub fn repair_gaps(mut blocks: Vec<Block>, config: &OptimizeConfig) -> StageOutcome {
    let gap = config.min_gap_ms;
    let mut changed = 0;
    let mut diagnostics = Vec::new();

    for i in 0..blocks.len() {
        if blocks[i].duration_ms() <= 0 {
            blocks[i].end_ms = blocks[i].start_ms + config.min_duration_ms;
            changed += 1;
        }
        if i + 1 == blocks.len() {
            break;
        }

        let next_start = blocks[i + 1].start_ms;
        if next_start - blocks[i].end_ms >= gap {
            continue;
        }

        let shrunk_end = next_start - gap;
        if shrunk_end > blocks[i].start_ms {
            blocks[i].end_ms = shrunk_end;
        } else {
            let end = blocks[i].start_ms + config.min_duration_ms;
            blocks[i].end_ms = end;
            let next = &mut blocks[i + 1];
            next.start_ms = end + gap;
            if next.end_ms <= next.start_ms {
                next.end_ms = next.start_ms + config.min_duration_ms;
            }
            diagnostics.push(Diagnostic::new(
                STAGE,
                i + 1,
                &blocks[i + 1],
                "start moved to make room for a colliding block",
            ));
        }
        changed += 1;
    }

    if changed > 0 {
        debug!(changed, "repaired gaps");
    }
    StageOutcome::new(blocks, changed).with_diagnostics(diagnostics)
}
