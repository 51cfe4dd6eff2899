use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::Preset;

#[derive(Parser, Debug)]
#[command(
    name = "srt_tools",
    version,
    about = "Checks and small transforms for finished SRT files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check an SRT against its transcript and the reading limits.
    Validate(ValidateArgs),
    /// Move every block by a constant offset.
    Shift(ShiftArgs),
    /// Find the constant offset between two timings of the same text.
    Detect(DetectArgs),
    /// Export the text as plain paragraphs split on long pauses.
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// SRT file to check.
    #[arg(long)]
    pub srt: PathBuf,
    /// Plain-text transcript the subtitles must reproduce word for word.
    #[arg(long, required_unless_present = "skip_text_check")]
    pub transcript: Option<PathBuf>,
    /// Speech JSON used for the time range check.
    #[arg(long = "speech-json")]
    pub speech_json: Option<PathBuf>,
    /// Also write the report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// JSON file with limit overrides.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Limits to start from before applying the config file.
    #[arg(long, value_enum, default_value_t = Preset::SingleLine)]
    pub preset: Preset,
    /// Skip the text preservation check.
    #[arg(long)]
    pub skip_text_check: bool,
    /// Skip the speech time range check.
    #[arg(long)]
    pub skip_time_check: bool,
    /// Do not fail on blocks above the hard CPS limit.
    #[arg(long)]
    pub skip_cps_check: bool,
    /// Do not fail on blocks outside the duration limits.
    #[arg(long)]
    pub skip_duration_check: bool,
}

impl ValidateArgs {
    pub fn validate(&self) -> Result<()> {
        if !self.srt.is_file() {
            bail!("SRT file does not exist: {:?}", self.srt);
        }
        if let Some(transcript) = &self.transcript {
            if !transcript.is_file() {
                bail!("Transcript file does not exist: {:?}", transcript);
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ShiftArgs {
    /// Input SRT file.
    #[arg(long)]
    pub srt: PathBuf,
    /// Offset in milliseconds; negative values move blocks earlier.
    #[arg(long = "offset-ms", allow_hyphen_values = true)]
    pub offset_ms: i64,
    /// Where to write the shifted SRT.
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Reference SRT file.
    #[arg(long)]
    pub srt1: PathBuf,
    /// SRT file whose offset against the reference is reported.
    #[arg(long)]
    pub srt2: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Input SRT file.
    #[arg(long)]
    pub srt: PathBuf,
    /// Where to write the text.
    #[arg(long)]
    pub output: PathBuf,
    /// Silence longer than this starts a new paragraph [default: 2000].
    #[arg(long = "pause-ms")]
    pub pause_ms: Option<i64>,
    /// Separate paragraphs with a blank line.
    #[arg(long)]
    pub double_spacing: bool,
    /// Talk metadata YAML; title, date, location and language go in a header.
    #[arg(long)]
    pub meta: Option<PathBuf>,
}

impl ExportArgs {
    pub fn validate(&self) -> Result<()> {
        if let Some(pause_ms) = self.pause_ms.filter(|&ms| ms < 0) {
            bail!("Pause threshold must be non-negative, got {}", pause_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_negative_shift() {
        let cli = Cli::try_parse_from([
            "srt_tools",
            "shift",
            "--srt",
            "in.srt",
            "--offset-ms",
            "-1500",
            "--output",
            "out.srt",
        ])
        .expect("parse cli");
        match cli.command {
            Command::Shift(args) => assert_eq!(args.offset_ms, -1500),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn validate_requires_transcript_unless_skipped() {
        assert!(Cli::try_parse_from(["srt_tools", "validate", "--srt", "a.srt"]).is_err());
        let cli = Cli::try_parse_from([
            "srt_tools",
            "validate",
            "--srt",
            "a.srt",
            "--skip-text-check",
        ])
        .expect("parse cli");
        assert!(matches!(cli.command, Command::Validate(_)));
    }

    #[test]
    fn export_pause_is_optional() {
        let cli = Cli::try_parse_from(["srt_tools", "export", "--srt", "a.srt", "--output", "a.txt"])
            .expect("parse cli");
        match cli.command {
            Command::Export(args) => {
                assert_eq!(args.pause_ms, None);
                assert!(!args.double_spacing);
                assert!(args.meta.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_detect() {
        let cli = Cli::try_parse_from(["srt_tools", "detect", "--srt1", "a.srt", "--srt2", "b.srt"])
            .expect("parse cli");
        match cli.command {
            Command::Detect(args) => {
                assert_eq!(args.srt1.to_str(), Some("a.srt"));
                assert_eq!(args.srt2.to_str(), Some("b.srt"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
