//! Fixed stage order for one subtitle track

use serde::Serialize;
use tracing::{debug, info};

use super::chain::chain;
use super::lines::shape_lines;
use super::merge::{merge_short, merge_sparse};
use super::normalize::{normalize, repair_gaps};
use super::redistribute::{absorb_gaps, cascade, extend};
use super::split::{split_by_duration, split_by_rate, split_by_size};
use super::{Diagnostic, StageOutcome};
use crate::config::{OptimizeConfig, Tunables};
use crate::types::{Block, SpeechTimings};

/// Extension passes after the short-block merge
const EXTEND_PASSES: usize = 3;

/// How many blocks one stage touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: &'static str,
    pub changed: usize,
}

/// Optimized track plus everything the stages reported
#[derive(Debug, Clone, Default)]
pub struct Optimized {
    pub blocks: Vec<Block>,
    pub stages: Vec<StageCount>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Optimized {
    pub fn total_changes(&self) -> usize {
        self.stages.iter().map(|s| s.changed).sum()
    }
}

/// Runs every stage in order over one track. Holds no mutable state, so a
/// single optimizer can serve several threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Optimizer<'a> {
    config: &'a OptimizeConfig,
    tunables: &'a Tunables,
}

/// Collects stage results while threading the block list through
struct Run {
    stages: Vec<StageCount>,
    diagnostics: Vec<Diagnostic>,
}

impl Run {
    fn record(&mut self, stage: &'static str, outcome: StageOutcome) -> (Vec<Block>, usize) {
        info!(
            stage,
            changed = outcome.changed,
            blocks = outcome.blocks.len(),
            "stage complete"
        );
        self.stages.push(StageCount {
            stage,
            changed: outcome.changed,
        });
        self.diagnostics.extend(outcome.diagnostics);
        (outcome.blocks, outcome.changed)
    }
}

impl<'a> Optimizer<'a> {
    pub fn new(config: &'a OptimizeConfig, tunables: &'a Tunables) -> Self {
        Self { config, tunables }
    }

    pub fn run(&self, mut blocks: Vec<Block>, speech: &SpeechTimings) -> Optimized {
        let config = self.config;
        let tunables = self.tunables;
        let mut run = Run {
            stages: Vec::new(),
            diagnostics: Vec::new(),
        };

        info!(
            blocks = blocks.len(),
            speech_segments = speech.segments.len(),
            speech_words = speech.words.len(),
            "optimizing track"
        );
        blocks.sort_by_key(|b| b.start_ms);

        (blocks, _) = run.record("normalize", normalize(blocks, config));
        (blocks, _) = run.record("sparse_merge", merge_sparse(blocks, config, tunables));
        (blocks, _) = run.record("shape_lines", shape_lines(blocks, config, tunables));
        (blocks, _) = run.record(
            "split_duration",
            split_by_duration(blocks, config, tunables, speech),
        );
        (blocks, _) = run.record("split_size", split_by_size(blocks, config, tunables));

        (blocks, _) = run.record("repair", repair_gaps(blocks, config));
        (blocks, _) = run.record("extend", extend(blocks, config));

        (blocks, _) = run.record("split_rate", split_by_rate(blocks, config, tunables));
        (blocks, _) = run.record("merge_short", merge_short(blocks, config, tunables));

        (blocks, _) = run.record("repair", repair_gaps(blocks, config));
        for pass in 0..EXTEND_PASSES {
            let (extended_blocks, extended) = run.record("extend", extend(blocks, config));
            (blocks, _) = run.record("repair", repair_gaps(extended_blocks, config));
            if extended == 0 {
                debug!(pass, "extension settled");
                break;
            }
        }

        (blocks, _) = run.record("cascade", cascade(blocks, config, tunables));
        (blocks, _) = run.record("absorb_gaps", absorb_gaps(blocks, config, tunables));
        (blocks, _) = run.record("extend", extend(blocks, config));
        (blocks, _) = run.record("repair", repair_gaps(blocks, config));
        (blocks, _) = run.record("shape_lines", shape_lines(blocks, config, tunables));

        (blocks, _) = run.record("min_duration", enforce_min_duration(blocks, config));
        if !speech.segments.is_empty() {
            (blocks, _) = run.record(
                "trim_sparse_oversized",
                trim_oversized_sparse(blocks, config, tunables, speech),
            );
        }

        (blocks, _) = run.record("normalize", normalize(blocks, config));
        (blocks, _) = run.record("extend", extend(blocks, config));
        (blocks, _) = run.record("repair", repair_gaps(blocks, config));
        (blocks, _) = run.record("chain", chain(blocks, config));

        for (i, block) in blocks.iter_mut().enumerate() {
            block.ordinal = i + 1;
        }
        run.diagnostics.extend(residual_violations(&blocks, config));

        let optimized = Optimized {
            blocks,
            stages: run.stages,
            diagnostics: run.diagnostics,
        };
        info!(
            blocks = optimized.blocks.len(),
            changes = optimized.total_changes(),
            diagnostics = optimized.diagnostics.len(),
            "optimization finished"
        );
        optimized
    }
}

/// Lengthen blocks under `min_duration_ms`, end first and then start,
/// without crossing into a neighbor's gap.
pub fn enforce_min_duration(mut blocks: Vec<Block>, config: &OptimizeConfig) -> StageOutcome {
    let gap = config.min_gap_ms;
    let mut changed = 0;

    for i in 0..blocks.len() {
        if blocks[i].duration_ms() >= config.min_duration_ms {
            continue;
        }
        let max_end = blocks.get(i + 1).map(|next| next.start_ms - gap);
        let min_start = i.checked_sub(1).map_or(0, |prev| blocks[prev].end_ms + gap);

        let block = &mut blocks[i];
        let before = (block.start_ms, block.end_ms);

        let mut end = block.start_ms + config.min_duration_ms;
        if let Some(max_end) = max_end {
            end = end.min(max_end);
        }
        block.end_ms = block.end_ms.max(end);

        let missing = config.min_duration_ms - block.duration_ms();
        if missing > 0 {
            let room = (block.start_ms - min_start).max(0);
            block.start_ms -= missing.min(room);
        }

        if (block.start_ms, block.end_ms) != before {
            changed += 1;
        }
    }

    debug!(changed, "enforced minimum duration");
    StageOutcome::new(blocks, changed)
}

/// Pull in the end of long, nearly empty blocks to where the speech they
/// overlap stops, plus a margin. Only applied when it saves real time.
pub fn trim_oversized_sparse(
    mut blocks: Vec<Block>,
    config: &OptimizeConfig,
    tunables: &Tunables,
    speech: &SpeechTimings,
) -> StageOutcome {
    let mut changed = 0;

    for i in 0..blocks.len() {
        let next_start = blocks.get(i + 1).map(|next| next.start_ms);
        let block = &mut blocks[i];
        if block.duration_ms() <= config.max_duration_ms || block.cps() >= tunables.oversize_sparse_cps
        {
            continue;
        }

        let speech_end = speech
            .best_overlap_end(block.start_ms, block.end_ms)
            .unwrap_or(block.start_ms);
        let reading = block
            .reading_time_ms(config.target_cps)
            .max(config.min_duration_ms);
        let mut end = (block.start_ms + reading).max(speech_end + tunables.speech_end_margin_ms);
        if let Some(next_start) = next_start {
            end = end.min(next_start - config.min_gap_ms);
        }

        if end > block.start_ms && block.end_ms - end >= tunables.min_trim_saving_ms {
            block.end_ms = end;
            changed += 1;
        }
    }

    debug!(changed, "trimmed oversized sparse blocks");
    StageOutcome::new(blocks, changed)
}

/// Hard limits still broken after every stage has had its turn
fn residual_violations(blocks: &[Block], config: &OptimizeConfig) -> Vec<Diagnostic> {
    const STAGE: &str = "final";
    let mut diagnostics = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        if block.cps() > config.hard_max_cps {
            diagnostics.push(Diagnostic::new(
                STAGE,
                i,
                block,
                format!(
                    "{:.1} CPS above hard limit {:.1}",
                    block.cps(),
                    config.hard_max_cps
                ),
            ));
        }
        if block.duration_ms() < config.min_duration_ms {
            diagnostics.push(Diagnostic::new(
                STAGE,
                i,
                block,
                format!("{} ms below minimum duration", block.duration_ms()),
            ));
        }
        if block.max_line_len() > config.max_cpl {
            diagnostics.push(Diagnostic::new(
                STAGE,
                i,
                block,
                format!("{} chars per line above {}", block.max_line_len(), config.max_cpl),
            ));
        }
    }
    diagnostics
}
