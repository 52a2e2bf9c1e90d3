mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod session;
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
    /// Operate on built-in demo data
    pub demo: bool,
    pub config: config::Config,
    pub config_path: PathBuf,
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
        generate(shell, &mut cmd, "intune-tools", &mut io::stdout());
        return Ok(());
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => paths::config_file()?,
    };
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        demo: cli.demo,
        config: config::Config::load_from(&config_path)?,
        config_path,
    };

    match cli.command {
        Command::Login { method } => commands::login::run(&ctx, method.map(Into::into)),
        Command::Groups { kind, filter } => {
            commands::list::groups(&ctx, kind.map(Into::into), filter)
        }
        Command::Apps(args) => commands::list::apps(&ctx, args),
        Command::Assignments { app_id } => commands::list::assignments(&ctx, &app_id),
        Command::Assign(args) => commands::assign::run(&ctx, args),
        Command::Interactive => commands::interactive::run(&ctx),
        Command::Clear { app_id, yes } => commands::clear::run(&ctx, &app_id, yes),
        Command::Stats => commands::stats::run(&ctx),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { .. } => Ok(()),
    }
}
