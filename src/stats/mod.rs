//! Constraint evaluation: per-block metrics and track-wide aggregates
//!
//! Everything here is read-only over the block list, so computing stats twice
//! on the same input always yields the same value.

use std::fmt;

use serde::Serialize;

use crate::config::OptimizeConfig;
use crate::types::Block;

/// Metrics for a single block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockMetrics {
    pub ordinal: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    pub duration_ms: i64,
    pub chars: usize,
    pub cps: f64,
    pub cpl: usize,
    pub lines: usize,
    pub text: String,
}

impl BlockMetrics {
    pub fn of(block: &Block) -> Self {
        Self {
            ordinal: block.ordinal,
            start_ms: block.start_ms,
            end_ms: block.end_ms,
            duration_ms: block.duration_ms(),
            chars: block.char_count(),
            cps: block.cps(),
            cpl: block.max_line_len(),
            lines: block.line_count(),
            text: block.flat_text(),
        }
    }
}

/// Aggregate constraint counts for a track
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub cps_over_target: usize,
    pub cps_over_hard: usize,
    pub cpl_over_max: usize,
    pub duration_under_min: usize,
    pub duration_over_max: usize,
    pub lines_over_max: usize,
    pub chars_over_block: usize,
    pub overlaps: usize,
    pub gap_under_min: usize,
    pub avg_cps: f64,
    pub median_cps: f64,
    pub max_cps: f64,
    pub avg_cpl: f64,
    pub max_cpl: usize,
    pub total_chars: usize,
}

impl Stats {
    pub fn compute(blocks: &[Block], config: &OptimizeConfig) -> Self {
        if blocks.is_empty() {
            return Self::default();
        }

        let metrics: Vec<BlockMetrics> = blocks.iter().map(BlockMetrics::of).collect();
        let mut stats = Stats {
            total: blocks.len(),
            ..Stats::default()
        };

        for m in &metrics {
            if m.cps > config.target_cps {
                stats.cps_over_target += 1;
            }
            if m.cps > config.hard_max_cps {
                stats.cps_over_hard += 1;
            }
            if m.cpl > config.max_cpl {
                stats.cpl_over_max += 1;
            }
            if m.duration_ms < config.min_duration_ms {
                stats.duration_under_min += 1;
            }
            if m.duration_ms > config.max_duration_ms {
                stats.duration_over_max += 1;
            }
            if m.lines > config.max_lines {
                stats.lines_over_max += 1;
            }
            if m.chars > config.max_chars_block {
                stats.chars_over_block += 1;
            }
            stats.total_chars += m.chars;
        }

        for pair in blocks.windows(2) {
            let gap = pair[1].start_ms - pair[0].end_ms;
            if gap < 0 {
                stats.overlaps += 1;
            } else if gap < config.min_gap_ms {
                stats.gap_under_min += 1;
            }
        }

        let count = metrics.len() as f64;
        let mut cps_values: Vec<f64> = metrics.iter().map(|m| m.cps).collect();
        cps_values.sort_by(f64::total_cmp);
        stats.avg_cps = cps_values.iter().sum::<f64>() / count;
        stats.median_cps = cps_values[cps_values.len() / 2];
        stats.max_cps = cps_values[cps_values.len() - 1];
        stats.avg_cpl = metrics.iter().map(|m| m.cpl as f64).sum::<f64>() / count;
        stats.max_cpl = metrics.iter().map(|m| m.cpl).max().unwrap_or(0);

        stats
    }
}

/// The `n` blocks with the highest CPS, highest first; ties keep track order
pub fn worst_blocks(blocks: &[Block], n: usize) -> Vec<BlockMetrics> {
    let mut metrics: Vec<BlockMetrics> = blocks.iter().map(BlockMetrics::of).collect();
    metrics.sort_by(|a, b| b.cps.total_cmp(&a.cps));
    metrics.truncate(n);
    metrics
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  blocks:             {}", self.total)?;
        writeln!(f, "  CPS > target:       {}", self.cps_over_target)?;
        writeln!(f, "  CPS > hard max:     {}", self.cps_over_hard)?;
        writeln!(f, "  CPL > max:          {}", self.cpl_over_max)?;
        writeln!(f, "  duration < min:     {}", self.duration_under_min)?;
        writeln!(f, "  duration > max:     {}", self.duration_over_max)?;
        writeln!(f, "  lines > max:        {}", self.lines_over_max)?;
        writeln!(f, "  chars > block max:  {}", self.chars_over_block)?;
        writeln!(f, "  overlaps:           {}", self.overlaps)?;
        writeln!(f, "  gaps < min:         {}", self.gap_under_min)?;
        writeln!(
            f,
            "  CPS avg/median/max: {:.1} / {:.1} / {:.1}",
            self.avg_cps, self.median_cps, self.max_cps
        )?;
        write!(f, "  CPL avg/max:        {:.1} / {}", self.avg_cpl, self.max_cpl)
    }
}
