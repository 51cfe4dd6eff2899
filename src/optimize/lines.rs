//! Line layout inside a block

use tracing::debug;

use super::{Diagnostic, StageOutcome};
use crate::boundary::find_line_split;
use crate::config::{OptimizeConfig, Tunables};
use crate::types::Block;

const STAGE: &str = "shape_lines";

/// Single-line mode flattens every block. Otherwise blocks whose lines are
/// too long, or too many, are rewrapped onto two lines.
pub fn shape_lines(mut blocks: Vec<Block>, config: &OptimizeConfig, tunables: &Tunables) -> StageOutcome {
    let mut changed = 0;
    let mut diagnostics = Vec::new();

    for (i, block) in blocks.iter_mut().enumerate() {
        let shaped = if config.single_line || config.max_lines < 2 {
            block.flat_text()
        } else if block.max_line_len() > config.max_cpl || block.line_count() > config.max_lines {
            let flat = block.flat_text();
            match find_line_split(&flat, config.max_cpl, tunables) {
                Some(pos) => format!("{}\n{}", &flat[..pos], &flat[pos + 1..]),
                None => flat,
            }
        } else {
            continue;
        };

        if shaped != block.text {
            block.text = shaped;
            changed += 1;
        }
        if block.max_line_len() > config.max_cpl && !config.single_line {
            diagnostics.push(Diagnostic::new(
                STAGE,
                i,
                block,
                format!("line of {} chars exceeds {}", block.max_line_len(), config.max_cpl),
            ));
        }
    }

    debug!(changed, "shaped lines");
    StageOutcome::new(blocks, changed).with_diagnostics(diagnostics)
}
