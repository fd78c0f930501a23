//! Copy command - copies a disc's files, skipping what cannot be read

use anyhow::{Context, Result};
use console::style;
use dvdsalvage_core::{CopySettings, CopySummary, DiscCopier};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::println_if;
use crate::progress::CopyDisplay;

/// Arguments for the copy command
pub struct CopyArgs {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub chunk_blocks: Option<u64>,
    pub settings: CopySettings,
    pub verbose: bool,
    pub quiet: bool,
    pub silent: bool,
}

/// Execute the copy command
pub fn execute(args: CopyArgs) -> Result<()> {
    let quiet = args.quiet || args.silent;
    let config = super::copy_config(&args.settings, args.chunk_blocks, false, args.verbose);

    println_if!(
        quiet,
        "{} {}",
        style("Source:").bold(),
        style(args.source.display()).cyan()
    );
    println_if!(
        quiet,
        "{} {}\n",
        style("Destination:").bold(),
        style(args.destination.display()).cyan()
    );

    let display = CopyDisplay::new(quiet);
    let observer = display.clone();
    let mut copier = DiscCopier::open(&args.source, &args.destination, config)
        .with_context(|| format!("Failed to open disc at {}", args.source.display()))?
        .on_event(move |event| observer.handle(event));

    let start_time = Instant::now();
    let result = copier.copy_all();
    display.finish();
    let summary = result.context("Copy aborted")?;

    if !quiet {
        print_summary(
            &summary,
            copier.ledger_path(),
            start_time.elapsed().as_secs_f64(),
        );
        if summary.missing_sectors > 0 {
            println!(
                "  Run 'dvdsalvage repair {} {}' to retry them.",
                args.source.display(),
                args.destination.display()
            );
        }
    }
    Ok(())
}

fn print_summary(summary: &CopySummary, ledger: &Path, seconds: f64) {
    println!(
        "\n{} Copied {} file(s), linked {}, skipped {} in {:.1}s",
        style("✓").green(),
        summary.files_copied,
        summary.files_linked,
        summary.files_skipped,
        seconds
    );
    if summary.files_absent > 0 {
        println!(
            "  {} {} file(s) listed but not found on the disc",
            style("ℹ").blue(),
            summary.files_absent
        );
    }
    if summary.missing_sectors > 0 {
        println!(
            "{} {} sector(s) could not be read, recorded in {}",
            style("Warning:").yellow(),
            summary.missing_sectors,
            ledger.display()
        );
    }
}
