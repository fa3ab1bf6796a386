pub mod annotate;
pub mod cli;
pub mod comparator;
pub mod compare;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod io_utils;
pub mod report;
pub mod table;
pub mod workbook;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::Cli;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(level: LevelFilter) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("id_reconcile", level);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        LevelFilter::Warn
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(log_level(&cli));
    debug!("Parsed arguments: {:?}", cli);
    comparator::execute(&cli)
}
