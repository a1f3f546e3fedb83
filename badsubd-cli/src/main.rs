mod cli_client;
mod cli_options;
mod pretty_util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use badsubd_common::config::EngineConfig;
use engine::Engine;
use sql::SqlFrontend;

use crate::cli_client::CliClient;
use crate::cli_options::{CliOptions, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "badsubd")]
#[command(version = "0.1.0")]
#[command(author = "fengyang <yueny09@163.com>")]
#[command(about = "BadSUBD: a small single-node storage engine with a tiny SQL dialect")]
#[command(long_about = None)]
struct CliArgs {
    /// Base directory holding schemas/, tables/ and indexes/
    #[arg(long, help = "base data directory", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Optional layered config file, overridden by BADSUBD_* env vars
    #[arg(short, long, help = "path to a badsubd.toml configuration file", value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, help = "log level: trace|debug|info|warn|error", value_name = "LEVEL")]
    log_level: Option<String>,

    #[arg(long, help = "directory for rolling log files; stdout if omitted", value_name = "DIR")]
    log_dir: Option<String>,

    /// enable debug info
    #[arg(short, long, help = "enable debug mode (per-statement timing)", default_value_t = false)]
    debug: bool,

    #[arg(short = 'o', long = "format", help = "row output format: table|json|yaml", default_value = "table")]
    format: String,

    #[arg(short = 'e', long = "execute", help = "execute a single SQL statement and exit", value_name = "SQL")]
    execute: Option<String>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let mut config = match EngineConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(data_dir) = &args.data_dir {
        config.set_data_dir(data_dir.clone());
    }
    if args.log_level.is_some() || args.log_dir.is_some() {
        let mut logging = config.logging().clone();
        if let Some(level) = &args.log_level {
            logging.set_level(level.clone());
        }
        if let Some(dir) = &args.log_dir {
            logging.set_log_dir(Some(dir.clone()));
        }
        config.set_logging(logging);
    }

    badsubd_common::logging::init(config.logging());

    let format = match args.format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("failed to open data directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = CliClient::new(SqlFrontend::new(engine), CliOptions::new(args.debug, format));

    match args.execute {
        Some(sql) => client.run_once(&sql),
        None => client.run_repl(),
    }
}
