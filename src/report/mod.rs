//! Before/after report for one optimization run

use std::fmt;

use serde::Serialize;

use crate::config::OptimizeConfig;
use crate::optimize::{Diagnostic, Optimized, StageCount};
use crate::speech::SpeechComparison;
use crate::stats::{worst_blocks, BlockMetrics, Stats};
use crate::types::Block;

const WORST_BLOCKS: usize = 10;
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub config: OptimizeConfig,
    pub before: Stats,
    pub after: Stats,
    pub stages: Vec<StageCount>,
    pub worst_blocks: Vec<BlockMetrics>,
    pub text_preserved: bool,
    pub chars_before: usize,
    pub chars_after: usize,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech: Option<SpeechComparison>,
}

/// Texts joined with single spaces, all whitespace runs collapsed
pub fn normalized_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .flat_map(|b| b.text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

impl OptimizationReport {
    pub fn new(
        original: &[Block],
        optimized: &Optimized,
        config: &OptimizeConfig,
        speech: Option<SpeechComparison>,
    ) -> Self {
        let text_before = normalized_text(original);
        let text_after = normalized_text(&optimized.blocks);
        Self {
            config: config.clone(),
            before: Stats::compute(original, config),
            after: Stats::compute(&optimized.blocks, config),
            stages: optimized.stages.clone(),
            worst_blocks: worst_blocks(&optimized.blocks, WORST_BLOCKS),
            text_preserved: text_before == text_after,
            chars_before: text_before.chars().count(),
            chars_after: text_after.chars().count(),
            diagnostics: optimized.diagnostics.clone(),
            speech,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Signed change with an arrow pointing the way it moved
fn change(before: usize, after: usize) -> String {
    match after.cmp(&before) {
        std::cmp::Ordering::Equal => "--".to_string(),
        std::cmp::Ordering::Less => format!("-{} v", before - after),
        std::cmp::Ordering::Greater => format!("+{} ^", after - before),
    }
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subtitle optimization report")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(
            f,
            "Text preservation: {} ({} -> {} chars)",
            if self.text_preserved { "OK" } else { "CHANGED" },
            self.chars_before,
            self.chars_after
        )?;

        if let Some(speech) = &self.speech {
            writeln!(
                f,
                "Speech: {} segments, {} blocks start early, {} end late",
                speech.segments, speech.early_starts, speech.late_ends
            )?;
        }

        writeln!(f)?;
        writeln!(f, "{:<24} {:>10} {:>10} {:>10}", "PARAMETER", "BEFORE", "AFTER", "CHANGE")?;
        writeln!(f, "{}", "-".repeat(57))?;
        let (b, a) = (&self.before, &self.after);
        let rows = [
            ("CPS > target", b.cps_over_target, a.cps_over_target),
            ("CPS > hard max", b.cps_over_hard, a.cps_over_hard),
            ("Max CPL", b.max_cpl, a.max_cpl),
            ("CPL > max", b.cpl_over_max, a.cpl_over_max),
            ("Chars > max block", b.chars_over_block, a.chars_over_block),
            ("Lines > max", b.lines_over_max, a.lines_over_max),
            ("Duration < min", b.duration_under_min, a.duration_under_min),
            ("Duration > max", b.duration_over_max, a.duration_over_max),
            ("Overlaps", b.overlaps, a.overlaps),
            ("Gaps < min", b.gap_under_min, a.gap_under_min),
        ];
        writeln!(f, "{:<24} {:>10} {:>10}", "Total blocks", b.total, a.total)?;
        writeln!(f, "{:<24} {:>10.1} {:>10.1}", "Avg CPS", b.avg_cps, a.avg_cps)?;
        writeln!(f, "{:<24} {:>10.1} {:>10.1}", "Median CPS", b.median_cps, a.median_cps)?;
        writeln!(f, "{:<24} {:>10.1} {:>10.1}", "Max CPS", b.max_cps, a.max_cps)?;
        for (label, before, after) in rows {
            writeln!(
                f,
                "{:<24} {:>10} {:>10} {:>10}",
                label,
                before,
                after,
                change(before, after)
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Stages:")?;
        for stage in self.stages.iter().filter(|s| s.changed > 0) {
            writeln!(f, "  {:<24} {}", stage.stage, stage.changed)?;
        }

        writeln!(f)?;
        writeln!(f, "Worst CPS blocks (top {}):", WORST_BLOCKS)?;
        for m in &self.worst_blocks {
            let preview: String = m.text.chars().take(PREVIEW_CHARS).collect();
            writeln!(
                f,
                "  #{}: CPS={:.1} ({}ch/{:.1}s) \"{}\"",
                m.ordinal,
                m.cps,
                m.chars,
                m.duration_ms as f64 / 1000.0,
                preview
            )?;
        }

        if !self.diagnostics.is_empty() {
            writeln!(f)?;
            writeln!(f, "Diagnostics ({}):", self.diagnostics.len())?;
            for diagnostic in &self.diagnostics {
                writeln!(f, "  {}", diagnostic)?;
            }
        }
        Ok(())
    }
}
