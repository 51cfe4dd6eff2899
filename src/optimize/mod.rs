//! Readability optimization stages and the pipeline that sequences them
//!
//! Every stage takes the block list by value and hands back a new one along
//! with how many blocks it touched. Stages never fail: when a block cannot be
//! fixed they leave it as is and record a [`Diagnostic`].

pub mod chain;
pub mod lines;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod redistribute;
pub mod snap;
pub mod split;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::Serialize;

use crate::types::Block;

pub use pipeline::{Optimized, Optimizer, StageCount};

/// A constraint a stage could not satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: &'static str,
    /// Index of the block in the list the stage was working on
    pub position: usize,
    pub start_ms: i64,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        stage: &'static str,
        position: usize,
        block: &Block,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            position,
            start_ms: block.start_ms,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] block #{} at {}: {}",
            self.stage,
            self.position + 1,
            crate::srt::format_timecode(self.start_ms),
            self.message
        )
    }
}

/// Result of one stage pass
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub blocks: Vec<Block>,
    pub changed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageOutcome {
    pub fn new(blocks: Vec<Block>, changed: usize) -> Self {
        Self {
            blocks,
            changed,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Fold a follow-up pass into this outcome, keeping the later blocks
    fn absorb(&mut self, next: StageOutcome) {
        self.blocks = next.blocks;
        self.changed += next.changed;
        self.diagnostics.extend(next.diagnostics);
    }
}
