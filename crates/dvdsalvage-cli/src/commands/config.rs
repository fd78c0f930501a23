//! Configuration file management command

use anyhow::{Context, Result};
use console::style;
use dvdsalvage_core::Settings;
use std::path::PathBuf;

/// Arguments for the config command
pub struct ConfigArgs {
    /// Initialize a new configuration file with defaults
    pub init: bool,
    /// Show the path to the configuration file
    pub path: bool,
    /// Show configuration in JSON format
    pub json: bool,
    /// Suppress output (for scripting)
    pub silent: bool,
    /// Custom configuration file path (overrides default)
    pub config_file: Option<PathBuf>,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    let config_path = args.config_file.clone().or_else(Settings::config_path);

    if args.path {
        if let Some(path) = &config_path {
            if !args.silent {
                println!("{}", path.display());
            }
        } else if !args.silent {
            eprintln!("{}", style("Could not determine config path").yellow());
        }
        return Ok(());
    }

    if args.init {
        return init_config(config_path, args.silent);
    }

    show_config(config_path, args.json, args.silent)
}

/// Write a configuration file with default values, keeping an existing one
fn init_config(config_path: Option<PathBuf>, silent: bool) -> Result<()> {
    let path = config_path.context("Could not determine configuration directory")?;

    if path.exists() {
        if !silent {
            eprintln!(
                "{} Configuration file already exists at: {}",
                style("Warning:").yellow(),
                path.display()
            );
            eprintln!("Edit it with a text editor, or delete it to re-initialize.");
        }
        return Ok(());
    }

    let saved_path = Settings::default()
        .save_to_path(Some(path))
        .context("Failed to save configuration file")?;

    if !silent {
        println!(
            "{} Created configuration file at: {}",
            style("Success:").green(),
            saved_path.display()
        );
        println!();
        println!("Example settings:");
        println!();
        println!("  [copy]");
        println!("  chunk_blocks = 64           # Smaller reads around damaged areas");
        println!("  repair_chunk_blocks = 1     # Retry one sector at a time");
        println!("  ledger_file_name = \"dvdsalvage.bad\"");
        println!();
        println!("  [behavior]");
        println!("  quiet = false");
    }

    Ok(())
}

fn show_config(config_path: Option<PathBuf>, json: bool, silent: bool) -> Result<()> {
    if silent {
        return Ok(());
    }

    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let settings = Settings::load_from_path(config_path.clone());

    if json {
        let json_output = serde_json::to_string_pretty(&settings)
            .context("Failed to serialize settings to JSON")?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("{}", style("dvdsalvage Configuration").bold());
    println!();

    if let Some(path) = &config_path {
        if config_exists {
            println!("  {} {}", style("Config file:").dim(), path.display());
        } else {
            println!(
                "  {} {} {}",
                style("Config file:").dim(),
                path.display(),
                style("(not found, using defaults)").yellow()
            );
        }
    }
    println!();

    println!("{}", style("[copy]").cyan());
    println!("  chunk_blocks = {}", settings.copy.chunk_blocks);
    println!(
        "  repair_chunk_blocks = {}",
        settings.copy.repair_chunk_blocks
    );
    println!("  ledger_file_name = \"{}\"", settings.copy.ledger_file_name);
    println!();

    println!("{}", style("[behavior]").cyan());
    println!("  quiet = {}", settings.behavior.quiet);

    if !config_exists {
        println!();
        println!(
            "{}",
            style("Run 'dvdsalvage config --init' to create a configuration file.").dim()
        );
    }

    Ok(())
}
