//! Optimization limits, tunable thresholds and their JSON override layer

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Reading-speed and layout limits for one subtitle track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeConfig {
    pub target_cps: f64,
    pub hard_max_cps: f64,
    pub max_cpl: usize,
    pub max_lines: usize,
    pub max_chars_block: usize,
    pub min_duration_ms: i64,
    pub max_duration_ms: i64,
    pub min_gap_ms: i64,
    /// Only used to turn frame counts into milliseconds when chaining
    pub fps: u32,
    pub single_line: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            target_cps: 15.0,
            hard_max_cps: 20.0,
            max_cpl: 84,
            max_lines: 1,
            max_chars_block: 84,
            min_duration_ms: 1200,
            max_duration_ms: 15000,
            min_gap_ms: 80,
            fps: 24,
            single_line: true,
        }
    }
}

impl OptimizeConfig {
    /// Two short lines per block instead of one long line
    pub fn line_oriented() -> Self {
        Self {
            max_cpl: 42,
            max_lines: 2,
            max_duration_ms: 7000,
            single_line: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_cps > 0.0,
            "target_cps must be positive, got {}",
            self.target_cps
        );
        ensure!(
            self.hard_max_cps >= self.target_cps,
            "hard_max_cps ({}) must be >= target_cps ({})",
            self.hard_max_cps,
            self.target_cps
        );
        ensure!(self.max_cpl > 0, "max_cpl must be greater than zero");
        ensure!(self.max_lines > 0, "max_lines must be greater than zero");
        ensure!(
            self.max_chars_block > 0,
            "max_chars_block must be greater than zero"
        );
        ensure!(
            self.min_duration_ms > 0,
            "min_duration_ms must be positive, got {}",
            self.min_duration_ms
        );
        ensure!(
            self.max_duration_ms > self.min_duration_ms,
            "max_duration_ms ({}) must be greater than min_duration_ms ({})",
            self.max_duration_ms,
            self.min_duration_ms
        );
        ensure!(
            self.min_gap_ms >= 0,
            "min_gap_ms must be non-negative, got {}",
            self.min_gap_ms
        );
        ensure!(self.fps > 0, "fps must be greater than zero");
        Ok(())
    }

    pub fn frame_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }
}

/// Language-specific word classes and the thresholds the stages share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Lowercase words that open a clause; a line break before them reads well
    pub conjunctions: HashSet<String>,
    pub prepositions: HashSet<String>,
    /// Below this CPS a short block counts as sparse
    pub sparse_cps_threshold: f64,
    pub sparse_max_chars: usize,
    /// Time donations at or below this are ignored
    pub noise_floor_ms: i64,
    /// Silence wider than this can be absorbed by a neighboring chain
    pub large_gap_ms: i64,
    pub cascade_radius: usize,
    pub gap_search_radius: usize,
    pub snap_window_ms: i64,
    pub segment_gap_min_ms: i64,
    pub word_gap_min_ms: i64,
    pub duration_split_slack_ms: i64,
    pub min_split_chars: usize,
    pub rate_split_min_chars: usize,
    pub rate_split_min_half: usize,
    pub short_text_chars: usize,
    pub short_text_max_ms: i64,
    pub merge_gap_ms: i64,
    pub sparse_merge_gap_ms: i64,
    pub sparse_trim_factor: f64,
    pub oversize_sparse_cps: f64,
    pub speech_end_margin_ms: i64,
    pub min_trim_saving_ms: i64,
    pub paragraph_pause_ms: i64,
}

const DEFAULT_CONJUNCTIONS: &[&str] = &[
    "що", "який", "яка", "яке", "які", "і", "та", "але", "бо", "тому", "коли", "де", "як", "ні",
    "або", "чи", "адже", "проте", "однак", "якщо", "хоча",
];

const DEFAULT_PREPOSITIONS: &[&str] = &[
    "в", "у", "на", "з", "із", "від", "до", "для", "без", "через", "після", "перед", "між", "під",
    "над", "за", "при", "про", "по",
];

impl Default for Tunables {
    fn default() -> Self {
        Self {
            conjunctions: DEFAULT_CONJUNCTIONS.iter().map(|w| w.to_string()).collect(),
            prepositions: DEFAULT_PREPOSITIONS.iter().map(|w| w.to_string()).collect(),
            sparse_cps_threshold: 4.0,
            sparse_max_chars: 20,
            noise_floor_ms: 30,
            large_gap_ms: 200,
            cascade_radius: 8,
            gap_search_radius: 10,
            snap_window_ms: 3000,
            segment_gap_min_ms: 100,
            word_gap_min_ms: 200,
            duration_split_slack_ms: 1000,
            min_split_chars: 10,
            rate_split_min_chars: 15,
            rate_split_min_half: 5,
            short_text_chars: 20,
            short_text_max_ms: 3000,
            merge_gap_ms: 500,
            sparse_merge_gap_ms: 3000,
            sparse_trim_factor: 1.5,
            oversize_sparse_cps: 2.0,
            speech_end_margin_ms: 500,
            min_trim_saving_ms: 2000,
            paragraph_pause_ms: 2000,
        }
    }
}

impl Tunables {
    pub fn is_conjunction(&self, word: &str) -> bool {
        self.conjunctions.contains(&normalize_word(word))
    }

    pub fn is_preposition(&self, word: &str) -> bool {
        self.prepositions.contains(&normalize_word(word))
    }
}

fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .to_string()
}

/// Named starting point for a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Preset {
    /// One long line per block (max_cpl 84, 15 s blocks)
    #[default]
    SingleLine,
    /// Up to two 42-character lines, 7 s blocks
    LineOriented,
}

impl Preset {
    pub fn config(self) -> OptimizeConfig {
        match self {
            Preset::SingleLine => OptimizeConfig::default(),
            Preset::LineOriented => OptimizeConfig::line_oriented(),
        }
    }
}

/// Partial configuration parsed from a JSON file or command-line flags
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, alias = "targetCps")]
    pub target_cps: Option<f64>,
    #[serde(default, alias = "hardMaxCps")]
    pub hard_max_cps: Option<f64>,
    #[serde(default)]
    pub max_cpl: Option<usize>,
    #[serde(default)]
    pub max_lines: Option<usize>,
    #[serde(default)]
    pub max_chars_block: Option<usize>,
    #[serde(default, alias = "min_duration")]
    pub min_duration_ms: Option<i64>,
    #[serde(default, alias = "max_duration")]
    pub max_duration_ms: Option<i64>,
    #[serde(default, alias = "min_gap")]
    pub min_gap_ms: Option<i64>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub single_line: Option<bool>,
    #[serde(default)]
    pub tunables: Option<Tunables>,
}

impl ConfigOverrides {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::parse(&data).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse config JSON")
    }

    pub fn apply(&self, base: OptimizeConfig) -> OptimizeConfig {
        OptimizeConfig {
            target_cps: self.target_cps.unwrap_or(base.target_cps),
            hard_max_cps: self.hard_max_cps.unwrap_or(base.hard_max_cps),
            max_cpl: self.max_cpl.unwrap_or(base.max_cpl),
            max_lines: self.max_lines.unwrap_or(base.max_lines),
            max_chars_block: self.max_chars_block.unwrap_or(base.max_chars_block),
            min_duration_ms: self.min_duration_ms.unwrap_or(base.min_duration_ms),
            max_duration_ms: self.max_duration_ms.unwrap_or(base.max_duration_ms),
            min_gap_ms: self.min_gap_ms.unwrap_or(base.min_gap_ms),
            fps: self.fps.unwrap_or(base.fps),
            single_line: self.single_line.unwrap_or(base.single_line),
        }
    }

    pub fn apply_tunables(&self, base: Tunables) -> Tunables {
        self.tunables.clone().unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_line_preset() {
        let config = OptimizeConfig::default();
        assert_eq!(config.max_cpl, 84);
        assert_eq!(config.max_lines, 1);
        assert_eq!(config.max_duration_ms, 15000);
        assert!(config.single_line);
        assert_eq!(Preset::SingleLine.config(), config);
        config.validate().unwrap();
    }

    #[test]
    fn line_oriented_preset_overrides_layout() {
        let config = Preset::LineOriented.config();
        assert_eq!(config.max_cpl, 42);
        assert_eq!(config.max_lines, 2);
        assert_eq!(config.max_duration_ms, 7000);
        assert_eq!(config.min_gap_ms, 80);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_inverted_cps_limits() {
        let config = OptimizeConfig {
            target_cps: 25.0,
            ..OptimizeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_max_duration_below_min() {
        let config = OptimizeConfig {
            max_duration_ms: 1000,
            ..OptimizeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_layer_onto_preset() {
        let overrides = ConfigOverrides::parse(
            r#"{"target_cps": 17.0, "min_gap": 120, "tunables": {"sparse_cps_threshold": 3.0}}"#,
        )
        .unwrap();
        let config = overrides.apply(OptimizeConfig::line_oriented());
        assert_eq!(config.target_cps, 17.0);
        assert_eq!(config.min_gap_ms, 120);
        assert_eq!(config.max_cpl, 42);

        let tunables = overrides.apply_tunables(Tunables::default());
        assert_eq!(tunables.sparse_cps_threshold, 3.0);
        assert_eq!(tunables.noise_floor_ms, 30);
        assert!(tunables.is_conjunction("що"));
    }

    #[test]
    fn rejects_unknown_config_keys() {
        assert!(ConfigOverrides::parse(r#"{"target_cpz": 17.0}"#).is_err());
    }

    #[test]
    fn word_classes_ignore_case_and_trailing_punctuation() {
        let tunables = Tunables::default();
        assert!(tunables.is_conjunction("Але,"));
        assert!(tunables.is_preposition("ДО"));
        assert!(!tunables.is_preposition("слово"));
    }
}
