use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use subreflow::config::{ConfigOverrides, OptimizeConfig, Preset, Tunables};
use subreflow::optimize::Optimizer;
use subreflow::report::OptimizationReport;
use subreflow::speech::{blocks_from_segments, compare_with_speech, load_transcript, timings_from_transcript};
use subreflow::srt::{read_srt, write_srt};
use subreflow::types::{Block, SpeechTimings};
use tracing::info;

/// subreflow - subtitle retiming and reflow
///
/// Splits, merges and retimes subtitle blocks until they respect reading
/// speed, line length and duration limits, without touching the words.
#[derive(Parser, Debug)]
#[command(name = "subreflow")]
#[command(version)]
#[command(about = "Subtitle retiming and reflow optimizer", long_about = None)]
struct Args {
    /// Input SRT file
    #[arg(long, value_name = "PATH", conflicts_with = "aligned_json")]
    srt: Option<PathBuf>,

    /// Aligned speech JSON to build the blocks from instead of an SRT
    #[arg(long, value_name = "PATH", conflicts_with = "srt")]
    aligned_json: Option<PathBuf>,

    /// Speech JSON with segment and word timings used for snapping
    #[arg(long, value_name = "PATH")]
    speech_json: Option<PathBuf>,

    /// Where to write the optimized SRT
    #[arg(long, value_name = "PATH")]
    output: PathBuf,

    /// Write the text report here
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Write the JSON report here
    #[arg(long, value_name = "PATH")]
    report_json: Option<PathBuf>,

    /// JSON file with limit and tunable overrides
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Starting limits before the config file and flags are applied
    #[arg(long, value_enum, default_value_t = Preset::SingleLine)]
    preset: Preset,

    #[arg(long)]
    target_cps: Option<f64>,
    #[arg(long)]
    hard_max_cps: Option<f64>,
    #[arg(long)]
    max_cpl: Option<usize>,
    #[arg(long)]
    max_lines: Option<usize>,
    #[arg(long)]
    max_chars_block: Option<usize>,
    #[arg(long)]
    min_duration_ms: Option<i64>,
    #[arg(long)]
    max_duration_ms: Option<i64>,
    #[arg(long)]
    min_gap_ms: Option<i64>,
    #[arg(long)]
    fps: Option<u32>,

    /// Allow two lines per block (at least two lines, wrapped at max CPL)
    #[arg(long)]
    multi_line: bool,

    /// Exit with an error if any block stays above the hard CPS limit
    #[arg(long)]
    fail_on_hard_cps: bool,
}

impl Args {
    fn validate(&self) -> Result<()> {
        let input = match (&self.srt, &self.aligned_json) {
            (Some(path), _) | (None, Some(path)) => path,
            (None, None) => bail!("Provide the input via --srt or --aligned-json"),
        };
        if !input.is_file() {
            bail!("Input file does not exist: {:?}", input);
        }
        if let Some(speech) = &self.speech_json {
            if !speech.is_file() {
                bail!("Speech JSON does not exist: {:?}", speech);
            }
        }
        if self.output.is_dir() {
            bail!("Output path is a directory: {:?}", self.output);
        }
        Ok(())
    }

    fn flag_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_cps: self.target_cps,
            hard_max_cps: self.hard_max_cps,
            max_cpl: self.max_cpl,
            max_lines: self.max_lines,
            max_chars_block: self.max_chars_block,
            min_duration_ms: self.min_duration_ms,
            max_duration_ms: self.max_duration_ms,
            min_gap_ms: self.min_gap_ms,
            fps: self.fps,
            single_line: self.multi_line.then_some(false),
            tunables: None,
        }
    }

    /// Preset, then config file, then flags; validated at the end
    fn resolve_config(&self) -> Result<(OptimizeConfig, Tunables)> {
        let mut config = self.preset.config();
        let mut tunables = Tunables::default();
        if let Some(path) = &self.config {
            let file = ConfigOverrides::from_file(path)?;
            config = file.apply(config);
            tunables = file.apply_tunables(tunables);
        }
        config = self.flag_overrides().apply(config);
        if self.multi_line {
            config.max_lines = config.max_lines.max(2);
        }
        config.validate().context("Invalid configuration")?;
        Ok((config, tunables))
    }
}

fn main() -> Result<()> {
    subreflow::init_tracing();
    let args = Args::parse();

    args.validate()
        .context("Failed to validate command-line arguments")?;
    let (config, tunables) = args.resolve_config()?;

    let (blocks, aligned_speech) = load_input(&args)?;
    let speech = match &args.speech_json {
        Some(path) => timings_from_transcript(&load_transcript(path)?),
        None => aligned_speech.unwrap_or_default(),
    };
    info!(
        blocks = blocks.len(),
        single_line = config.single_line,
        max_cpl = config.max_cpl,
        "input loaded"
    );

    let optimized = Optimizer::new(&config, &tunables).run(blocks.clone(), &speech);
    write_srt(&optimized.blocks, &args.output)?;

    let comparison =
        (!speech.segments.is_empty()).then(|| compare_with_speech(&optimized.blocks, &speech));
    let report = OptimizationReport::new(&blocks, &optimized, &config, comparison);
    if let Some(path) = &args.report {
        write_text(path, &format!("{}\n", report))?;
    }
    if let Some(path) = &args.report_json {
        let json = report.to_json().context("Failed to serialize report")?;
        write_text(path, &json)?;
    }

    println!(
        "Optimized {} -> {} blocks ({} changes)",
        blocks.len(),
        optimized.blocks.len(),
        optimized.total_changes()
    );
    println!(
        "Text preservation: {}",
        if report.text_preserved { "OK" } else { "CHANGED" }
    );
    println!(
        "CPS > target: {} -> {}, CPS > hard max: {} -> {}",
        report.before.cps_over_target,
        report.after.cps_over_target,
        report.before.cps_over_hard,
        report.after.cps_over_hard
    );
    println!("Written {:?}", args.output);

    if args.fail_on_hard_cps && report.after.cps_over_hard > 0 {
        bail!(
            "{} blocks remain above the hard limit of {} CPS",
            report.after.cps_over_hard,
            config.hard_max_cps
        );
    }
    Ok(())
}

/// Blocks from the SRT, or from aligned segments together with their timings
fn load_input(args: &Args) -> Result<(Vec<Block>, Option<SpeechTimings>)> {
    if let Some(path) = &args.srt {
        return Ok((read_srt(path)?, None));
    }
    if let Some(path) = &args.aligned_json {
        let transcript = load_transcript(path)?;
        let blocks = blocks_from_segments(&transcript);
        return Ok((blocks, Some(timings_from_transcript(&transcript))));
    }
    bail!("No input source provided");
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}
