//! SRT reading and writing
//!
//! Malformed blocks are skipped with a warning instead of failing the file.

pub mod timecode;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::types::Block;

pub use timecode::{format_timecode, parse_timecode};

/// Read an SRT file from disk
pub fn read_srt(path: &Path) -> Result<Vec<Block>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read SRT file {:?}", path))?;
    Ok(parse_srt(&content))
}

/// Parse SRT content into blocks, in file order
pub fn parse_srt(content: &str) -> Vec<Block> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut blocks = Vec::new();

    for raw in split_raw_blocks(&content) {
        match parse_raw_block(&raw) {
            Ok(block) => blocks.push(block),
            Err(err) => {
                let first_line = raw.first().copied().unwrap_or_default();
                warn!(block = first_line, error = %err, "skipping malformed SRT block");
            }
        }
    }

    blocks
}

fn split_raw_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut raw_blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                raw_blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        raw_blocks.push(current);
    }
    raw_blocks
}

fn parse_raw_block(lines: &[&str]) -> Result<Block> {
    anyhow::ensure!(
        lines.len() >= 3,
        "expected ordinal, timing and text lines, got {} line(s)",
        lines.len()
    );
    let ordinal: usize = lines[0]
        .trim()
        .parse()
        .with_context(|| format!("invalid ordinal '{}'", lines[0].trim()))?;
    let (start, end) = lines[1]
        .split_once("-->")
        .with_context(|| format!("invalid timing line '{}'", lines[1]))?;
    let start_ms = parse_timecode(start)?;
    // Positioning hints may follow the end timecode
    let end_ms = parse_timecode(end.split_whitespace().next().unwrap_or_default())?;
    anyhow::ensure!(
        end_ms >= start_ms,
        "block ends before it starts ({} > {})",
        start.trim(),
        end.trim()
    );
    let text = lines[2..].join("\n");
    Ok(Block::new(ordinal, start_ms, end_ms, text))
}

/// Render blocks as SRT with sequential ordinals starting at 1
pub fn render_srt(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timecode(block.start_ms),
            format_timecode(block.end_ms),
            block.text
        );
    }
    out
}

pub fn write_srt(blocks: &[Block], path: &Path) -> Result<()> {
    fs::write(path, render_srt(blocks))
        .with_context(|| format!("Failed to write SRT file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:03,500\nHello there.\n\n2\n00:00:04,000 --> 00:00:06,000\nTwo lines\nof text\n";

    #[test]
    fn parses_blocks_and_multiline_text() {
        let blocks = parse_srt(SAMPLE);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Block::new(1, 1000, 3500, "Hello there."));
        assert_eq!(blocks[1].text, "Two lines\nof text");
    }

    #[test]
    fn tolerates_bom_and_crlf() {
        let content = format!("\u{feff}{}", SAMPLE.replace('\n', "\r\n"));
        let blocks = parse_srt(&content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Hello there.");
    }

    #[test]
    fn skips_malformed_blocks() {
        let content = "x\n00:00:01,000 --> 00:00:02,000\nbad ordinal\n\n\
                       2\n00:00:01 --> 00:00:02,000\nbad timing\n\n\
                       3\n00:00:05,000 --> 00:00:04,000\nreversed\n\n\
                       4\n00:00:05,000 --> 00:00:06,000\n\n\
                       5\n00:00:07,000 --> 00:00:08,000\nkept\n";
        let blocks = parse_srt(content);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].ordinal, 5);
        assert_eq!(blocks[0].text, "kept");
    }

    #[test]
    fn renders_sequential_ordinals() {
        let blocks = vec![
            Block::new(7, 0, 1000, "first"),
            Block::new(9, 1100, 2000, "second"),
        ];
        let rendered = render_srt(&blocks);
        assert_eq!(
            rendered,
            "1\n00:00:00,000 --> 00:00:01,000\nfirst\n\n2\n00:00:01,100 --> 00:00:02,000\nsecond\n\n"
        );
        let reparsed = parse_srt(&rendered);
        assert_eq!(reparsed[1].ordinal, 2);
        assert_eq!(reparsed[1].start_ms, 1100);
    }
}
