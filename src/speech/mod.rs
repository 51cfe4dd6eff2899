//! Speech timing oracle - loads segment/word intervals from transcription JSON
//!
//! The transcription itself happens elsewhere; this module only reads its
//! output. Missing word data is fine: the optimizer simply snaps to segment
//! gaps, or not at all.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::types::{seconds_to_ms, Block, SpeechInterval, SpeechTimings, SpeechTranscript};

/// How far from a block edge a speech boundary still counts as "nearby"
const NEARBY_SPEECH_MS: i64 = 3000;
const EARLY_START_MS: i64 = 500;
const LATE_END_MS: i64 = 2000;

pub fn load_transcript(path: &Path) -> Result<SpeechTranscript> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read speech JSON {:?}", path))?;
    parse_transcript(&data).with_context(|| format!("Invalid speech JSON {:?}", path))
}

pub fn parse_transcript(raw: &str) -> Result<SpeechTranscript> {
    serde_json::from_str(raw).context("Failed to parse speech JSON")
}

/// Flatten a transcript into millisecond intervals
pub fn timings_from_transcript(transcript: &SpeechTranscript) -> SpeechTimings {
    let segments: Vec<SpeechInterval> = transcript
        .segments
        .iter()
        .map(|segment| {
            SpeechInterval::new(seconds_to_ms(segment.start), seconds_to_ms(segment.end))
        })
        .collect();
    let words: Vec<SpeechInterval> = transcript
        .segments
        .iter()
        .flat_map(|segment| segment.words.iter())
        .map(|word| SpeechInterval::new(seconds_to_ms(word.start), seconds_to_ms(word.end)))
        .collect();
    debug!(
        segments = segments.len(),
        words = words.len(),
        "speech timings loaded"
    );
    SpeechTimings { segments, words }
}

pub fn load_timings(path: &Path) -> Result<SpeechTimings> {
    Ok(timings_from_transcript(&load_transcript(path)?))
}

/// Build a block list from aligned segments; segments without text are dropped
pub fn blocks_from_segments(transcript: &SpeechTranscript) -> Vec<Block> {
    transcript
        .segments
        .iter()
        .filter_map(|segment| {
            let text = segment.text.trim();
            if text.is_empty() {
                return None;
            }
            Some((segment, text.to_string()))
        })
        .enumerate()
        .map(|(idx, (segment, text))| {
            Block::new(
                idx + 1,
                seconds_to_ms(segment.start),
                seconds_to_ms(segment.end),
                text,
            )
        })
        .collect()
}

/// How block edges line up with the speech they caption
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpeechComparison {
    pub segments: usize,
    pub blocks: usize,
    /// Blocks appearing more than 500 ms before nearby speech starts
    pub early_starts: usize,
    /// Blocks lingering more than 2 s after nearby speech ends
    pub late_ends: usize,
}

pub fn compare_with_speech(blocks: &[Block], speech: &SpeechTimings) -> SpeechComparison {
    let mut comparison = SpeechComparison {
        segments: speech.segments.len(),
        blocks: blocks.len(),
        ..SpeechComparison::default()
    };
    for block in blocks {
        if let Some(segment) = speech
            .segments
            .iter()
            .find(|s| (block.start_ms - s.start_ms).abs() < NEARBY_SPEECH_MS)
        {
            if block.start_ms < segment.start_ms - EARLY_START_MS {
                comparison.early_starts += 1;
            }
        }
        if let Some(segment) = speech
            .segments
            .iter()
            .find(|s| (block.end_ms - s.end_ms).abs() < NEARBY_SPEECH_MS)
        {
            if block.end_ms > segment.end_ms + LATE_END_MS {
                comparison.late_ends += 1;
            }
        }
    }
    comparison
}
