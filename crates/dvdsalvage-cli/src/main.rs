//! dvdsalvage - Copy a damaged video DVD, skipping unreadable sectors
//!
//! # Usage
//!
//! ```bash
//! # Copy a disc, recording unreadable sectors in movie/dvdsalvage.bad
//! dvdsalvage copy /media/dvd movie
//!
//! # Retry the recorded sectors, e.g. after cleaning the disc
//! dvdsalvage repair /media/dvd movie
//!
//! # Show the disc's files
//! dvdsalvage list /media/dvd
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use clap_mangen::Man;
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// dvdsalvage - Copy a damaged video DVD, skipping unreadable sectors
#[derive(Parser)]
#[command(name = "dvdsalvage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Suppress ALL output
    #[arg(long, global = true)]
    silent: bool,

    /// Use this configuration file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a disc into a destination directory
    Copy {
        /// Disc mount point or directory holding VIDEO_TS
        source: PathBuf,

        /// Destination directory
        destination: PathBuf,

        /// Sectors per read request (1-1024)
        #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=1024))]
        chunk_blocks: Option<u64>,
    },

    /// Retry the sectors recorded in the bad-sector file
    Repair {
        /// Disc mount point or directory holding VIDEO_TS
        source: PathBuf,

        /// Destination directory of an earlier copy
        destination: PathBuf,

        /// Sectors per retry request (1-1024)
        #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=1024))]
        chunk_blocks: Option<u64>,
    },

    /// List the files of a disc
    List {
        /// Disc mount point or directory holding VIDEO_TS
        source: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show or create the configuration file
    Config {
        /// Create a configuration file with default values
        #[arg(long)]
        init: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate man pages
    Mangen {
        /// Output directory for man pages
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
}

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{} {}", style("Error:").red().bold(), panic_info);
    }));

    if let Err(e) = run() {
        // `{:#}` prints the whole context chain on one line
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_file = cli
        .config_file
        .clone()
        .or_else(dvdsalvage_core::Settings::config_path);
    let settings = dvdsalvage_core::Settings::load_from_path(config_file.clone());
    let quiet = cli.quiet || cli.silent || settings.behavior.quiet;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match &config_file {
        Some(path) if path.exists() => tracing::debug!("Using configuration file {:?}", path),
        _ => tracing::debug!("No configuration file, using defaults"),
    }

    let silent = cli.silent;

    match cli.command {
        Commands::Copy {
            source,
            destination,
            chunk_blocks,
        } => {
            install_interrupt_handler("copy", &source, &destination, silent)?;
            commands::copy::execute(commands::copy::CopyArgs {
                source,
                destination,
                chunk_blocks,
                settings: settings.copy,
                verbose: cli.verbose,
                quiet,
                silent,
            })
        }
        Commands::Repair {
            source,
            destination,
            chunk_blocks,
        } => {
            install_interrupt_handler("repair", &source, &destination, silent)?;
            commands::repair::execute(commands::repair::RepairArgs {
                source,
                destination,
                chunk_blocks,
                settings: settings.copy,
                verbose: cli.verbose,
                quiet,
                silent,
            })
        }
        Commands::List { source, json } => commands::list::execute(&source, json, silent),
        Commands::Config { init, path, json } => commands::config::execute(commands::config::ConfigArgs {
            init,
            path,
            json,
            silent,
            config_file,
        }),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Mangen { out_dir } => generate_man_pages(&out_dir, silent),
    }
}

/// Exit with status 130 on Ctrl+C, telling the user how to pick up again
///
/// Output files and the ledger are written as the copy goes, so rerunning
/// the same command continues where this one stopped.
fn install_interrupt_handler(
    command: &'static str,
    source: &std::path::Path,
    destination: &std::path::Path,
    silent: bool,
) -> Result<()> {
    let hint = format!(
        "dvdsalvage {} {} {}",
        command,
        source.display(),
        destination.display()
    );
    ctrlc::set_handler(move || {
        if !silent {
            eprintln!("\n{}", style("Interrupted.").yellow().bold());
            eprintln!("  Run '{}' again to resume.", hint);
        }
        std::process::exit(130);
    })?;
    Ok(())
}

fn generate_man_pages(out_dir: &str, silent: bool) -> Result<()> {
    let cmd = Cli::command();
    let out_path = std::path::Path::new(out_dir);
    std::fs::create_dir_all(out_path)?;

    let man = Man::new(cmd.clone());
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    std::fs::write(out_path.join("dvdsalvage.1"), buffer)?;
    if !silent {
        println!("Generated: {}/dvdsalvage.1", out_dir);
    }

    for subcommand in cmd.get_subcommands() {
        let name = subcommand.get_name();
        if subcommand.is_hide_set() || matches!(name, "completions" | "mangen" | "help") {
            continue;
        }

        let man = Man::new(subcommand.clone());
        let mut buffer = Vec::new();
        man.render(&mut buffer)?;
        let filename = format!("dvdsalvage-{}.1", name);
        std::fs::write(out_path.join(&filename), buffer)?;
        if !silent {
            println!("Generated: {}/{}", out_dir, filename);
        }
    }

    if !silent {
        println!(
            "\nInstall with: sudo cp {}/*.1 /usr/local/share/man/man1/",
            out_dir
        );
    }
    Ok(())
}
