//! Pass/fail gate for a finished subtitle track

use std::fmt;

use unicode_normalization::UnicodeNormalization;

use crate::config::OptimizeConfig;
use crate::srt::format_timecode;
use crate::stats::{worst_blocks, Stats};
use crate::types::{Block, SpeechTimings};

/// Speech may start this much after the first block, or end this much
/// before the last one
const TIME_RANGE_TOLERANCE_MS: i64 = 2000;
const LISTED_PROBLEMS: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    pub skip_text_check: bool,
    pub skip_time_check: bool,
    pub skip_cps_check: bool,
    pub skip_duration_check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub passed: bool,
}

/// Word-level comparison between a transcript and the subtitle text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextComparison {
    pub transcript_chars: usize,
    pub subtitle_chars: usize,
    pub exact_match: bool,
    pub transcript_words: usize,
    pub subtitle_words: usize,
    pub words_match: bool,
    /// Where the word sequences first disagree, with a little context
    pub divergence: Option<String>,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokens with at least one letter or digit; bare punctuation is ignored
fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .collect()
}

pub fn compare_text(transcript: &str, blocks: &[Block]) -> TextComparison {
    let subtitle_text = blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let transcript: String = transcript.nfkc().collect();
    let subtitle_text: String = subtitle_text.nfkc().collect();
    let transcript_norm = collapse_whitespace(&transcript);
    let subtitle_norm = collapse_whitespace(&subtitle_text);
    let expected = words(&transcript);
    let actual = words(&subtitle_text);

    let divergence = if expected == actual {
        None
    } else {
        Some(describe_divergence(&expected, &actual))
    };

    TextComparison {
        transcript_chars: transcript_norm.chars().count(),
        subtitle_chars: subtitle_norm.chars().count(),
        exact_match: transcript_norm == subtitle_norm,
        transcript_words: expected.len(),
        subtitle_words: actual.len(),
        words_match: divergence.is_none(),
        divergence,
    }
}

fn describe_divergence(expected: &[&str], actual: &[&str]) -> String {
    let common = expected.len().min(actual.len());
    match (0..common).find(|&i| expected[i] != actual[i]) {
        Some(i) => {
            let from = i.saturating_sub(3);
            let to = (i + 4).min(common);
            format!(
                "first difference at word {}: transcript \"...{}...\" vs subtitles \"...{}...\"",
                i,
                expected[from..to].join(" "),
                actual[from..to].join(" ")
            )
        }
        None if expected.len() > actual.len() => format!(
            "subtitles stop after word {}; missing \"{}...\"",
            common,
            expected[common..(common + 10).min(expected.len())].join(" ")
        ),
        None => format!(
            "subtitles continue after word {}; extra \"{}...\"",
            common,
            actual[common..(common + 10).min(actual.len())].join(" ")
        ),
    }
}

/// Everything the validator found, renderable as a text report
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub checks: Vec<Check>,
    pub stats: Stats,
    pub text: Option<TextComparison>,
    /// Human-readable findings, in check order
    pub notes: Vec<String>,
    worst: Vec<String>,
    config: OptimizeConfig,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

pub fn validate_track(
    blocks: &[Block],
    transcript: Option<&str>,
    speech: Option<&SpeechTimings>,
    config: &OptimizeConfig,
    options: ValidationOptions,
) -> ValidationReport {
    let mut checks = Vec::new();
    let mut notes = Vec::new();
    let mut push = |name: String, passed: bool| checks.push(Check { name, passed });

    let text = match (options.skip_text_check, transcript) {
        (false, Some(transcript)) => {
            let comparison = compare_text(transcript, blocks);
            if let Some(divergence) = &comparison.divergence {
                notes.push(divergence.clone());
            }
            push("Text preservation".to_string(), comparison.words_match);
            Some(comparison)
        }
        _ => None,
    };

    let overlaps: Vec<(usize, i64)> = blocks
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].end_ms > pair[1].start_ms)
        .map(|(i, pair)| (i + 1, pair[0].end_ms - pair[1].start_ms))
        .collect();
    for &(i, overlap) in overlaps.iter().take(LISTED_PROBLEMS) {
        notes.push(format!(
            "#{} -> #{}: {} > {} (overlap {} ms)",
            blocks[i - 1].ordinal,
            blocks[i].ordinal,
            format_timecode(blocks[i - 1].end_ms),
            format_timecode(blocks[i].start_ms),
            overlap
        ));
    }
    push("No overlaps".to_string(), overlaps.is_empty());

    if !options.skip_time_check {
        if let Some(speech) = speech.filter(|s| !s.segments.is_empty()) {
            push("Time range".to_string(), time_range_ok(blocks, speech, &mut notes));
        }
    }

    let misnumbered: Vec<(usize, usize)> = blocks
        .iter()
        .enumerate()
        .filter(|(i, block)| block.ordinal != i + 1)
        .map(|(i, block)| (i + 1, block.ordinal))
        .collect();
    for &(expected, actual) in misnumbered.iter().take(LISTED_PROBLEMS) {
        notes.push(format!("expected #{}, got #{}", expected, actual));
    }
    push("Sequential numbering".to_string(), misnumbered.is_empty());

    let stats = Stats::compute(blocks, config);
    push(format!("CPL <= {}", config.max_cpl), stats.cpl_over_max == 0);
    push(format!("Gap >= {}ms", config.min_gap_ms), stats.gap_under_min == 0);
    if !options.skip_duration_check {
        push(
            format!("Duration >= {}ms", config.min_duration_ms),
            stats.duration_under_min == 0,
        );
        push(
            format!("Duration <= {}ms", config.max_duration_ms),
            stats.duration_over_max == 0,
        );
    }
    if !options.skip_cps_check {
        push(format!("CPS <= {}", config.hard_max_cps), stats.cps_over_hard == 0);
    }

    let worst = worst_blocks(blocks, LISTED_PROBLEMS)
        .into_iter()
        .map(|m| {
            let preview: String = m.text.chars().take(60).collect();
            format!(
                "#{}: CPS={:.1} ({}ch/{:.1}s) \"{}\"",
                m.ordinal,
                m.cps,
                m.chars,
                m.duration_ms as f64 / 1000.0,
                preview
            )
        })
        .collect();

    ValidationReport {
        checks,
        stats,
        text,
        notes,
        worst,
        config: config.clone(),
    }
}

fn time_range_ok(blocks: &[Block], speech: &SpeechTimings, notes: &mut Vec<String>) -> bool {
    let (Some(first_segment), Some(last_segment)) = (speech.segments.first(), speech.segments.last())
    else {
        return true;
    };
    let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
        return true;
    };

    let early = first_segment.start_ms - first.start_ms;
    let late = last.end_ms - last_segment.end_ms;
    if early > TIME_RANGE_TOLERANCE_MS {
        notes.push(format!("subtitles start {} ms before speech", early));
    }
    if late > TIME_RANGE_TOLERANCE_MS {
        notes.push(format!("subtitles end {} ms after speech", late));
    }
    early <= TIME_RANGE_TOLERANCE_MS && late <= TIME_RANGE_TOLERANCE_MS
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subtitle validation report")?;
        writeln!(f, "{}", "=".repeat(60))?;

        if let Some(text) = &self.text {
            writeln!(
                f,
                "Transcript: {} chars, {} words; subtitles: {} chars, {} words",
                text.transcript_chars, text.transcript_words, text.subtitle_chars, text.subtitle_words
            )?;
            writeln!(
                f,
                "Exact normalized match: {}",
                if text.exact_match { "OK" } else { "MISMATCH" }
            )?;
        }

        writeln!(f)?;
        write!(f, "{}", self.stats)?;
        writeln!(f)?;

        if !self.notes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Findings:")?;
            for note in &self.notes {
                writeln!(f, "  {}", note)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Worst CPS blocks (top {}):", LISTED_PROBLEMS)?;
        for line in &self.worst {
            writeln!(f, "  {}", line)?;
        }

        writeln!(f)?;
        for check in &self.checks {
            writeln!(
                f,
                "[{}] {}",
                if check.passed { "PASS" } else { "FAIL" },
                check.name
            )?;
        }
        writeln!(
            f,
            "Avg CPS: {:.1} (target <= {})",
            self.stats.avg_cps, self.config.target_cps
        )?;
        write!(
            f,
            "Overall: {}",
            if self.passed() { "PASSED" } else { "FAILED" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpeechInterval;

    fn track() -> Vec<Block> {
        vec![
            Block::new(1, 1000, 4000, "Good evening and welcome to the show."),
            Block::new(2, 5000, 8000, "Tonight we talk about\nrivers and seas."),
        ]
    }

    const TRANSCRIPT: &str =
        "Good evening and welcome to the show.\n\nTonight we talk about rivers and seas.\n";

    #[test]
    fn clean_track_passes() {
        let report = validate_track(
            &track(),
            Some(TRANSCRIPT),
            None,
            &OptimizeConfig::default(),
            ValidationOptions::default(),
        );
        assert!(report.passed(), "{}", report);
        let text = report.text.as_ref().unwrap();
        assert!(text.exact_match);
        assert_eq!(text.transcript_words, 14);
        assert!(report.to_string().ends_with("Overall: PASSED"));
    }

    #[test]
    fn reports_first_word_difference() {
        let comparison = compare_text("one two three four five", &[Block::new(1, 0, 2000, "one two tree four five")]);
        assert!(!comparison.words_match);
        let divergence = comparison.divergence.unwrap();
        assert!(divergence.contains("word 2"));
        assert!(divergence.contains("tree"));
    }

    #[test]
    fn reports_missing_tail() {
        let comparison = compare_text("one two three", &[Block::new(1, 0, 2000, "one two")]);
        assert!(comparison.divergence.unwrap().contains("missing \"three"));
    }

    #[test]
    fn compatibility_characters_compare_equal() {
        let comparison = compare_text("\u{fb01}nal \u{ff12}\u{ff10} words", &[Block::new(1, 0, 2000, "final 20 words")]);
        assert!(comparison.words_match);
        assert!(comparison.exact_match);
        assert_eq!(comparison.divergence, None);
    }

    #[test]
    fn punctuation_only_tokens_are_ignored() {
        let comparison = compare_text("one - two", &[Block::new(1, 0, 2000, "one two")]);
        assert!(comparison.words_match);
        assert!(!comparison.exact_match);
    }

    #[test]
    fn overlap_and_numbering_fail() {
        let blocks = vec![
            Block::new(1, 0, 3000, "Good evening and welcome to the show."),
            Block::new(3, 2500, 6000, "Tonight we talk about rivers and seas."),
        ];
        let report = validate_track(
            &blocks,
            None,
            None,
            &OptimizeConfig::default(),
            ValidationOptions {
                skip_text_check: true,
                ..ValidationOptions::default()
            },
        );
        assert!(!report.passed());
        let failed: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(failed, vec!["No overlaps", "Sequential numbering"]);
    }

    #[test]
    fn skips_duration_and_cps_checks_on_request() {
        let blocks = vec![Block::new(1, 0, 500, "Way too fast for anyone to read")];
        let config = OptimizeConfig::default();
        let strict = validate_track(&blocks, None, None, &config, ValidationOptions::default());
        assert!(!strict.passed());

        let lenient = validate_track(
            &blocks,
            None,
            None,
            &config,
            ValidationOptions {
                skip_cps_check: true,
                skip_duration_check: true,
                ..ValidationOptions::default()
            },
        );
        assert!(lenient.passed(), "{}", lenient);
    }

    #[test]
    fn time_range_uses_speech_bounds() {
        let speech = SpeechTimings {
            segments: vec![SpeechInterval::new(4000, 6000)],
            words: Vec::new(),
        };
        let report = validate_track(
            &track(),
            None,
            Some(&speech),
            &OptimizeConfig::default(),
            ValidationOptions::default(),
        );
        let time = report.checks.iter().find(|c| c.name == "Time range").unwrap();
        assert!(!time.passed);
        assert!(report.notes.iter().any(|n| n.contains("before speech")));
    }
}
