use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Block;

/// Talk metadata printed above the exported text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TalkMeta {
    #[serde(default)]
    pub title: Option<String>,
    /// Kept as raw YAML so both `2024-05-01` and `2024` are accepted
    #[serde(default)]
    pub date: Option<serde_yaml::Value>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl TalkMeta {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata file {:?}", path))?;
        Self::parse(&data).with_context(|| format!("Invalid metadata file {:?}", path))
    }

    /// An empty document yields empty metadata
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let meta: Option<TalkMeta> =
            serde_yaml::from_str(raw).context("Failed to parse metadata YAML")?;
        Ok(meta.unwrap_or_default())
    }

    /// Title, then "date, location", then the language; missing parts are skipped
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            lines.push(title.to_string());
        }

        let date = self.date.as_ref().and_then(|value| match value {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let place: Vec<String> = date
            .into_iter()
            .chain(self.location.clone())
            .filter(|part| !part.is_empty())
            .collect();
        if !place.is_empty() {
            lines.push(place.join(", "));
        }

        if let Some(language) = self.language.as_deref().filter(|l| !l.is_empty()) {
            lines.push(format!("Language: {}", language));
        }
        lines
    }
}

/// Header lines and a blank line (when there is a header), then the text,
/// newline terminated
pub fn render_export(header: &[String], text: &str) -> String {
    let mut out = String::new();
    if !header.is_empty() {
        for line in header {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(text);
    out.push('\n');
    out
}

/// Plain text of a track. A silence longer than `pause_ms` between two
/// blocks starts a new paragraph.
pub fn blocks_to_text(blocks: &[Block], pause_ms: i64, double_spacing: bool) -> String {
    let mut paragraphs: Vec<Vec<String>> = Vec::new();
    let mut previous_end: Option<i64> = None;

    for block in blocks {
        let text = block.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        let pause = previous_end.map_or(false, |end| block.start_ms - end > pause_ms);
        match paragraphs.last_mut() {
            Some(current) if !pause => current.push(text),
            _ => paragraphs.push(vec![text]),
        }
        previous_end = Some(block.end_ms);
    }

    let separator = if double_spacing { "\n\n" } else { "\n" };
    paragraphs
        .iter()
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Vec<Block> {
        vec![
            Block::new(1, 0, 1000, "Good evening"),
            Block::new(2, 1100, 2000, "and welcome."),
            Block::new(3, 6000, 8000, "Tonight we talk\nabout rivers."),
            Block::new(4, 8100, 9000, "   "),
            Block::new(5, 9100, 9500, "Stay."),
        ]
    }

    #[test]
    fn splits_paragraphs_on_long_pauses() {
        assert_eq!(
            blocks_to_text(&track(), 2000, false),
            "Good evening and welcome.\nTonight we talk about rivers. Stay."
        );
    }

    #[test]
    fn double_spacing_adds_blank_line() {
        assert_eq!(
            blocks_to_text(&track(), 2000, true),
            "Good evening and welcome.\n\nTonight we talk about rivers. Stay."
        );
    }

    #[test]
    fn pause_equal_to_threshold_stays_in_paragraph() {
        let blocks = vec![Block::new(1, 0, 1000, "one"), Block::new(2, 3000, 4000, "two")];
        assert_eq!(blocks_to_text(&blocks, 2000, false), "one two");
        assert_eq!(blocks_to_text(&blocks, 1999, false), "one\ntwo");
    }

    #[test]
    fn metadata_header_lines() {
        let meta = TalkMeta::parse(
            "title: Rivers and Seas\ndate: 2024-05-01\nlocation: Kyiv\nlanguage: uk\nspeaker: ignored\n",
        )
        .unwrap();
        assert_eq!(
            meta.header_lines(),
            vec!["Rivers and Seas", "2024-05-01, Kyiv", "Language: uk"]
        );
    }

    #[test]
    fn partial_metadata_skips_missing_parts() {
        let meta = TalkMeta::parse("date: 2024\nlanguage: en\n").unwrap();
        assert_eq!(meta.header_lines(), vec!["2024", "Language: en"]);
        assert!(TalkMeta::parse("").unwrap().header_lines().is_empty());
    }

    #[test]
    fn header_is_separated_from_text() {
        let header = vec!["Title".to_string(), "Language: uk".to_string()];
        assert_eq!(
            render_export(&header, "one\ntwo"),
            "Title\nLanguage: uk\n\none\ntwo\n"
        );
        assert_eq!(render_export(&[], "one"), "one\n");
    }

    #[test]
    fn empty_track_exports_nothing() {
        assert_eq!(blocks_to_text(&[], 2000, false), "");
    }
}
