//! WhatsApp Date Fixer - restore capture dates of WhatsApp media
//!
//! A CLI tool that rebuilds the timestamp of WhatsApp media files from
//! their names and writes it to the filesystem and EXIF metadata.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wa_date_fixer::{
    BatchRunner, CancellationToken, Cli, Config, RunOutcome, count_matching, layout,
};

// CLI Output Module
mod cli_output {
    //! Console styling for run messages and summaries

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;
    use wa_date_fixer::{Level, Message, MessageSink};

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    /// Print separator line
    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a warning line
    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print an error line
    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a hint line
    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a statistic
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print the log file location
    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    /// Sink printing runner messages to the console
    ///
    /// The runner traces the same events, so nothing is logged here.
    pub struct ConsoleSink;

    impl MessageSink for ConsoleSink {
        fn emit(&mut self, message: Message) {
            match message.level {
                Level::Info => {
                    let _ = stdout().execute(Print(format!("{}\n", message.text)));
                }
                Level::Warning => print_warning(&message.text),
                Level::Error => print_error(&message.text),
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first: it decides the log level
    let config = load_config(&cli)?;

    let log_path = get_log_path(&cli)?;
    let _guard = setup_logging(config.log_level(), cli.json_log, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "WhatsApp Date Fixer starting"
    );
    if let Some(ref config_path) = cli.config {
        info!(config_file = %config_path.display(), "Loaded configuration from file");
    }
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    if let Some(ref path) = cli.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Saving configuration to {}", path.display()))?;
        cli_output::print_hint(&format!("Configuration saved to {}", path.display()));
        return Ok(());
    }

    if cli.count_only {
        return run_count(&config);
    }

    run_fix(config, &log_path)
}

/// Fix every matching file, stopping cleanly on Ctrl+C
fn run_fix(config: Config, log_path: &Path) -> Result<()> {
    use cli_output::*;

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Installing the Ctrl+C handler")?;

    if config.dry_run {
        print_warning("Dry run: no file will be changed");
    }

    let runner = BatchRunner::new(config, token);
    let report = runner.run(&mut ConsoleSink);
    let stats = &report.stats;

    print_separator();
    print_stat("Modified", &stats.modified.to_string(), CliTheme::SUCCESS);
    print_stat("Skipped", &stats.skipped.to_string(), CliTheme::WARNING);
    print_stat("Failed", &stats.failed.to_string(), CliTheme::ERROR);
    print_stat("Possibly corrupted", &stats.suspect.to_string(), CliTheme::ERROR);
    print_separator();
    print_log_path(&log_path.display().to_string());

    match report.outcome {
        RunOutcome::Completed => info!("Run complete"),
        RunOutcome::Interrupted => warn!(
            processed = stats.index,
            total = stats.total_files,
            "Run interrupted"
        ),
    }

    Ok(())
}

/// Report how many WhatsApp media files each folder holds
fn run_count(config: &Config) -> Result<()> {
    use cli_output::*;

    for folder in layout::expand_folders(&config.folders, config.probe_layout) {
        match count_matching(&folder, config) {
            Ok(count) => print_stat(
                &folder.display().to_string(),
                &format!("{count} WhatsApp media files"),
                CliTheme::ACCENT,
            ),
            Err(e) => {
                error!(?folder, error = %e, "Failed to scan folder");
                print_error(&format!("{}: {}", folder.display(), e));
            }
        }
    }
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path from `--log-dir` or the executable location
fn get_log_path(cli: &Cli) -> Result<PathBuf> {
    let log_dir = match cli.log_dir {
        Some(ref dir) => dir.clone(),
        None => get_executable_dir()?.join("Log"),
    };
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(log_dir.join(format!("Run_{}.log", timestamp)))
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let file_config = Config::load_from_file(config_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.folders.is_empty() {
        anyhow::bail!("No folders to process: pass folders or set `folders` in the config file");
    }

    Ok(config)
}

/// Setup logging to the log file
///
/// The console belongs to the message sink, so nothing is logged to it.
fn setup_logging(level: Level, json: bool, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(Some(guard))
}
