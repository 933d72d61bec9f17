mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod provider;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "modelgarden", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli
            .config
            .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_CONFIG_FILE)),
        state_path: match cli.state {
            Some(path) => path,
            None => paths::state_file()?,
        },
    };
    log::debug!(
        "Using config {} and state {}",
        ctx.config_path.display(),
        ctx.state_path.display()
    );

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, &args),
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Destroy(args) => commands::destroy::run(&ctx, &args),
        Command::Show(args) => commands::show::run(&ctx, &args),
        Command::Schema(args) => commands::schema::run(&ctx, &args),
        Command::Completions { .. } => Ok(()),
    }
}
