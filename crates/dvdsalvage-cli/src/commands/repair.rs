//! Repair command - retries the sectors recorded by earlier copies

use anyhow::{Context, Result};
use console::style;
use dvdsalvage_core::{CopySettings, DiscCopier, RepairSummary};
use std::path::PathBuf;

use super::println_if;
use crate::progress::CopyDisplay;

/// Arguments for the repair command
pub struct RepairArgs {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub chunk_blocks: Option<u64>,
    pub settings: CopySettings,
    pub verbose: bool,
    pub quiet: bool,
    pub silent: bool,
}

/// Execute the repair command
pub fn execute(args: RepairArgs) -> Result<()> {
    let quiet = args.quiet || args.silent;
    let config = super::copy_config(&args.settings, args.chunk_blocks, true, args.verbose);

    let display = CopyDisplay::new(quiet);
    let observer = display.clone();
    let mut copier = DiscCopier::open(&args.source, &args.destination, config)
        .with_context(|| format!("Failed to open disc at {}", args.source.display()))?
        .on_event(move |event| observer.handle(event));

    println_if!(
        quiet,
        "{} {}\n",
        style("Ledger:").bold(),
        style(copier.ledger_path().display()).cyan()
    );

    let result = copier.second_pass();
    display.finish();
    let summary = result.context("Repair aborted")?;

    if !quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RepairSummary) {
    if !summary.ledger_found {
        println!("{} Nothing to repair", style("✓").green());
        return;
    }

    if !summary.malformed.is_empty() {
        println!(
            "  {} {} ledger line(s) could not be parsed",
            style("ℹ").blue(),
            summary.malformed.len()
        );
    }
    if !summary.unresolved.is_empty() {
        println!(
            "  {} {} record(s) name files this disc does not have",
            style("ℹ").blue(),
            summary.unresolved.len()
        );
    }

    let recovered = summary
        .outcomes
        .iter()
        .filter(|o| o.still_missing == 0)
        .count();
    if summary.total_missing == 0 {
        println!(
            "{} Recovered all {} recorded range(s)",
            style("✓").green(),
            recovered
        );
    } else {
        println!(
            "{} Recovered {} of {} range(s); {} sector(s) still missing",
            style("Warning:").yellow(),
            recovered,
            summary.outcomes.len(),
            summary.total_missing
        );
    }
}
