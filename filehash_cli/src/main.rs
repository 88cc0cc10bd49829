use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use filehash_cli::config::{AppConfig, ConfigManager, get_config};
use filehash_cli::file_discovery::{FileDiscoveryOptions, discover_files};
use filehash_cli::orchestrators::{
    HashOrchestrator, HashReport, HashRunOptions, clean_cache, summarize_cache,
};
use filehash_cli::output::OutputFormat;
use filehash_cli::progress::{format_age, format_bytes, format_duration};
use filehash_cli::terminal;
use filehash_core::unix_now;

#[derive(Parser)]
#[command(name = "filehash")]
#[command(author, version, about = "File hashing with a persistent hash cache", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use this cache file instead of the configured one
    #[arg(long, global = true, value_name = "FILE")]
    cache_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print SHA-1 hashes of files, reusing cached results
    Hash {
        /// Files or directories to hash
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Output format (defaults to output.default_format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Disable progress bar display
        #[arg(long)]
        no_progress: bool,

        /// Stop waiting for outstanding hashes after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },

    /// Remove cache entries not validated within the retention window
    Clean {
        /// Retention window in days (defaults to store.retention_days)
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<u32>,
    },

    /// Show cache file statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., store.retention_days)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., store.retention_days)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("filehash_core", log::LevelFilter::Debug)
            .filter_module("filehash_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        command => {
            let mut config = get_config().context("Failed to load configuration")?;
            config.apply_cli_overrides(cli.cache_file);
            if !config.output.color_enabled {
                colored::control::set_override(false);
            }

            match command {
                Commands::Hash {
                    paths,
                    recursive,
                    format,
                    no_progress,
                    timeout_secs,
                } => {
                    let format = match format {
                        Some(format) => format,
                        None => OutputFormat::from_string(&config.output.default_format)?,
                    };
                    let options = HashRunOptions {
                        timeout: timeout_secs.map(Duration::from_secs),
                        show_progress: !no_progress
                            && config.output.progress_enabled
                            && terminal::should_show_progress_by_default(),
                    };
                    hash_command(&config, &paths, recursive, format, options).await
                }
                Commands::Clean { retention_days } => clean_command(&config, retention_days).await,
                Commands::Stats => stats_command(&config).await,
                Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
            }
        }
    }
}

async fn hash_command(
    config: &AppConfig,
    paths: &[PathBuf],
    recursive: bool,
    format: OutputFormat,
    options: HashRunOptions,
) -> Result<()> {
    let discovery = FileDiscoveryOptions::new().with_recursive(recursive);
    let files = discover_files(paths, &discovery).context("File discovery failed")?;

    if files.is_empty() {
        eprintln!("{}", "No files found.".yellow());
        return Ok(());
    }
    log::debug!("Hashing {} file(s)", files.len());

    let orchestrator = HashOrchestrator::open(config).await?;
    let report = orchestrator.hash_files(&files, &options).await?;
    orchestrator.finish().await?;

    let use_color = config.output.color_enabled && terminal::supports_ansi();
    let output = format.formatter(use_color).format(&report.records)?;
    print!("{output}");

    if format == OutputFormat::Text && terminal::is_interactive() {
        print_summary(&report);
    }

    let failed = report.failed_count();
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) could not be hashed", failed, files.len());
    }
    Ok(())
}

fn print_summary(report: &HashReport) {
    eprintln!();
    eprintln!(
        "{} {} cached, {} hashed ({}), {} failed in {}",
        "Summary:".bold().green(),
        report.cached_count(),
        report.hashed_count(),
        format_bytes(report.hashed_bytes()),
        report.failed_count(),
        format_duration(report.elapsed)
    );
}

async fn clean_command(config: &AppConfig, retention_days: Option<u32>) -> Result<()> {
    let report = clean_cache(config, retention_days).await?;

    eprintln!(
        "{}",
        format!(
            "Removed {} entr{} older than {} day(s), {} remaining",
            report.removed,
            if report.removed == 1 { "y" } else { "ies" },
            report.retention_days,
            report.remaining
        )
        .green()
    );
    Ok(())
}

async fn stats_command(config: &AppConfig) -> Result<()> {
    let summary = summarize_cache(config).await?;
    let now = unix_now();

    println!("{}", "Hash cache:".bold().blue());
    println!("  {} {}", "File:".cyan(), summary.cache_file.display());
    println!("  {} {}", "Entries:".cyan(), summary.entry_count);
    println!(
        "  {} {} ({})",
        "Covered:".cyan(),
        format_bytes(summary.total_size_bytes),
        summary.total_size_bytes
    );
    if let (Some(oldest), Some(newest)) = (summary.oldest_access, summary.newest_access) {
        println!("  {} {}", "Oldest access:".cyan(), format_age(oldest, now));
        println!("  {} {}", "Newest access:".cyan(), format_age(newest, now));
    }
    println!(
        "  {} {} day(s)",
        "Retention:".cyan(),
        config.store.retention_days
    );
    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager.get(&key)?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());

            let mut current_section = "";
            for (key, value) in &items {
                let (section, field) = key.split_once('.').unwrap_or(("general", key.as_str()));
                if section != current_section {
                    println!();
                    println!("[{}]", section.yellow());
                    current_section = section;
                }
                println!("  {} = {}", field.cyan(), value);
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
