//! Core types for the subreflow retiming pipeline

use serde::{Deserialize, Serialize};

/// CPS reported for blocks whose duration is zero or negative.
pub const CPS_SENTINEL: f64 = 999.0;

/// One timed unit of subtitle text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position; renumbered on output
    pub ordinal: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    /// May contain `\n` between rendered lines
    pub text: String,
}

impl Block {
    pub fn new(ordinal: usize, start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Character count with line breaks removed
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|&c| c != '\n').count()
    }

    /// Text with line breaks replaced by single spaces
    pub fn flat_text(&self) -> String {
        self.text.replace('\n', " ")
    }

    pub fn cps(&self) -> f64 {
        chars_per_second(self.char_count(), self.duration_ms())
    }

    /// Longest rendered line, in characters
    pub fn max_line_len(&self) -> usize {
        self.text
            .split('\n')
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// Duration needed to read `chars` at `cps`, in milliseconds
    pub fn reading_time_ms(&self, cps: f64) -> i64 {
        reading_time_ms(self.char_count(), cps)
    }

    pub fn shift(&mut self, delta_ms: i64) {
        self.start_ms += delta_ms;
        self.end_ms += delta_ms;
    }
}

pub fn chars_per_second(chars: usize, duration_ms: i64) -> f64 {
    if duration_ms <= 0 {
        CPS_SENTINEL
    } else {
        chars as f64 / (duration_ms as f64 / 1000.0)
    }
}

/// Rounded up, so a block given exactly this long reads at or below `cps`
pub fn reading_time_ms(chars: usize, cps: f64) -> i64 {
    (chars as f64 * 1000.0 / cps).ceil() as i64
}

/// A time range where speech occurs, from the transcription oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechInterval {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl SpeechInterval {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }
}

/// Read-only speech timing oracle at segment and word granularity
#[derive(Debug, Clone, Default)]
pub struct SpeechTimings {
    pub segments: Vec<SpeechInterval>,
    pub words: Vec<SpeechInterval>,
}

impl SpeechTimings {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.words.is_empty()
    }

    /// End of the segment overlapping `[start_ms, end_ms)` the most
    pub fn best_overlap_end(&self, start_ms: i64, end_ms: i64) -> Option<i64> {
        let mut best: Option<(i64, i64)> = None;
        for segment in &self.segments {
            let overlap = segment.end_ms.min(end_ms) - segment.start_ms.max(start_ms);
            if overlap > 0 && best.map_or(true, |(current, _)| overlap > current) {
                best = Some((overlap, segment.end_ms));
            }
        }
        best.map(|(_, end)| end)
    }
}

/// Speech JSON as produced by the external transcription step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechTranscript {
    #[serde(default)]
    pub segments: Vec<SpeechSegment>,
}

/// A transcribed segment; times in fractional seconds
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<SpeechWord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechWord {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub word: String,
}

pub fn seconds_to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}
