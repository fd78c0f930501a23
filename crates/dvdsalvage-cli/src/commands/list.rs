//! List command - displays the logical files of a disc

use anyhow::{Context, Result};
use console::style;
use dvdsalvage_core::{FileTable, LogicalFile};
use humansize::{format_size, DECIMAL};
use std::path::Path;

/// Execute the list command
pub fn execute(source: &Path, json: bool, silent: bool) -> Result<()> {
    let table = dvdsalvage_core::list_files(source)
        .with_context(|| format!("Failed to list files on {}", source.display()))?;

    // JSON output mode - always output even in silent mode (it's machine-readable)
    if json {
        println!("{}", files_json(&table)?);
        return Ok(());
    }

    if silent {
        return Ok(());
    }

    if table.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    println!(
        "{} {} file(s) in {}:\n",
        style("Found").green().bold(),
        table.len(),
        source.display()
    );
    for file in &table {
        print_file(file);
    }

    let total: u64 = table
        .iter()
        .filter(|f| f.duplicate_of.is_none())
        .map(|f| f.size)
        .sum();
    println!(
        "\n{} {}",
        style("To copy:").dim(),
        format_size(total, DECIMAL)
    );
    Ok(())
}

fn print_file(file: &LogicalFile) {
    let size = format!("{:>10}", format_size(file.size, DECIMAL));
    match file.duplicate_of {
        Some(original) => println!(
            "  {:<14} {:>8}  {}  {}",
            style(file.file_name()).white().bold(),
            style(file.id).dim(),
            size,
            style(format!("same as {}", original.file_name())).cyan()
        ),
        None => println!(
            "  {:<14} {:>8}  {}",
            style(file.file_name()).white().bold(),
            style(file.id).dim(),
            size
        ),
    }
}

fn files_json(table: &FileTable) -> Result<String> {
    let files: Vec<_> = table
        .iter()
        .map(|f| {
            serde_json::json!({
                "name": f.file_name(),
                "title": f.id.title,
                "domain": f.id.domain,
                "number": f.id.number,
                "size": f.size,
                "duplicate_of": f.duplicate_of.map(|d| d.file_name()),
            })
        })
        .collect();
    serde_json::to_string_pretty(&files).context("Failed to serialize file list")
}
