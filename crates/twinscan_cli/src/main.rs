//! Command-line entry point.
//!
//! # Responsibility
//! - Map `scan`/`get` invocations onto `twinscan_api`.
//! - Print result rows as pretty JSON; exit non-zero on an error row.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "twinscan")]
#[command(about = "Historic email, phone and endpoint OSINT per domain")]
#[command(version)]
struct Cli {
    /// Snapshot database file
    #[arg(long, global = true, env = "TWINSCAN_DB_PATH")]
    db: Option<PathBuf>,

    /// TOML scan configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling log files; logs go to stderr when unset
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = twinscan_api::default_log_level())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan sources and replace the stored snapshot
    Scan { attribute: String, domain: String },

    /// Print the stored snapshot
    Get { attribute: String, domain: String },

    /// Check core linkage
    Ping,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::Ping = cli.command {
        println!("twinscan_core ping={}", twinscan_api::ping());
        println!("twinscan_core version={}", twinscan_api::core_version());
        return ExitCode::SUCCESS;
    }

    let log_error = twinscan_api::init_logging(cli.log_level.clone(), path_arg(&cli.log_dir));
    if !log_error.is_empty() {
        eprintln!("Error: {log_error}");
        return ExitCode::from(2);
    }
    let config_error = twinscan_api::configure(path_arg(&cli.db), path_arg(&cli.config));
    if !config_error.is_empty() {
        eprintln!("Error: {config_error}");
        return ExitCode::from(2);
    }

    let output = match cli.command {
        Command::Scan { attribute, domain } => twinscan_api::scan(attribute, domain),
        Command::Get { attribute, domain } => twinscan_api::get(attribute, domain),
        Command::Ping => return ExitCode::SUCCESS,
    };
    print_rows(&output)
}

fn path_arg(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default()
}

fn print_rows(output: &str) -> ExitCode {
    let rows: Value = match serde_json::from_str(output) {
        Ok(rows) => rows,
        Err(_) => {
            println!("{output}");
            return ExitCode::FAILURE;
        }
    };
    match serde_json::to_string_pretty(&rows) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{output}"),
    }

    let failed = rows
        .get(0)
        .and_then(|row| row.get("error"))
        .is_some();
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
