use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

// Exit codes: 0 success, 1 usage error, 2 any other failure.
fn main() {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    if let Err(err) = commands::run_command(cli) {
        if let Some(usage) = err.downcast_ref::<commands::UsageError>() {
            eprintln!("{} {usage}", "usage error:".red().bold());
            process::exit(1);
        }
        eprintln!("{} {err:#}", "error:".red().bold());
        process::exit(2);
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
