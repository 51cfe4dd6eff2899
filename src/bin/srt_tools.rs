use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use subreflow::config::{ConfigOverrides, Tunables};
use subreflow::speech::load_timings;
use subreflow::srt::{read_srt, write_srt};
use subreflow::tools::cli::{Cli, Command, DetectArgs, ExportArgs, ShiftArgs, ValidateArgs};
use subreflow::tools::export::{blocks_to_text, render_export, TalkMeta};
use subreflow::tools::shift::{detect_offset, shift_blocks};
use subreflow::tools::validate::{validate_track, ValidationOptions};

fn main() -> Result<()> {
    subreflow::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Validate(args) => handle_validate(&args),
        Command::Shift(args) => handle_shift(&args),
        Command::Detect(args) => handle_detect(&args),
        Command::Export(args) => handle_export(&args),
    }
}

fn handle_validate(args: &ValidateArgs) -> Result<()> {
    args.validate()
        .context("Failed to validate command-line arguments")?;

    let mut config = args.preset.config();
    if let Some(path) = &args.config {
        config = ConfigOverrides::from_file(path)?.apply(config);
    }
    config.validate().context("Invalid configuration")?;

    let blocks = read_srt(&args.srt)?;
    let transcript = match &args.transcript {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read transcript {:?}", path))?,
        ),
        None => None,
    };
    let speech = match &args.speech_json {
        Some(path) => Some(load_timings(path)?),
        None => None,
    };

    let report = validate_track(
        &blocks,
        transcript.as_deref(),
        speech.as_ref(),
        &config,
        ValidationOptions {
            skip_text_check: args.skip_text_check,
            skip_time_check: args.skip_time_check,
            skip_cps_check: args.skip_cps_check,
            skip_duration_check: args.skip_duration_check,
        },
    );
    let rendered = report.to_string();
    println!("{}", rendered);
    if let Some(path) = &args.report {
        fs::write(path, format!("{}\n", rendered))
            .with_context(|| format!("Failed to write report {:?}", path))?;
    }

    if !report.passed() {
        bail!("Validation failed for {:?}", args.srt);
    }
    Ok(())
}

fn handle_shift(args: &ShiftArgs) -> Result<()> {
    let blocks = read_srt(&args.srt)?;
    let shifted = shift_blocks(blocks, args.offset_ms)
        .with_context(|| format!("Cannot shift {:?}", args.srt))?;
    write_srt(&shifted, &args.output)?;
    println!(
        "Written {} blocks shifted by {} ms to {:?}",
        shifted.len(),
        args.offset_ms,
        args.output
    );
    Ok(())
}

fn handle_detect(args: &DetectArgs) -> Result<()> {
    let reference = read_srt(&args.srt1)?;
    let other = read_srt(&args.srt2)?;
    let detected = detect_offset(&reference, &other)
        .with_context(|| format!("No usable offset between {:?} and {:?}", args.srt1, args.srt2))?;
    let sign = if detected.offset_ms >= 0 { "+" } else { "" };
    let seconds = detected.offset_ms as f64 / 1000.0;
    println!("Text similarity: {:.4}", detected.similarity);
    println!("OFFSET: {}ms ({}{:.3}s)", detected.offset_ms, sign, seconds);
    println!("  srt2 = srt1 {}{:.3}s", sign, seconds);
    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<()> {
    args.validate()
        .context("Failed to validate command-line arguments")?;
    let blocks = read_srt(&args.srt)?;
    let pause_ms = args
        .pause_ms
        .unwrap_or_else(|| Tunables::default().paragraph_pause_ms);
    let text = blocks_to_text(&blocks, pause_ms, args.double_spacing);
    let header = match &args.meta {
        Some(path) => TalkMeta::from_file(path)?.header_lines(),
        None => Vec::new(),
    };
    fs::write(&args.output, render_export(&header, &text))
        .with_context(|| format!("Failed to write text export {:?}", args.output))?;
    println!("Exported {} blocks to {:?}", blocks.len(), args.output);
    Ok(())
}
