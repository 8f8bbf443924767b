//! divchain - chained integer division across two processes over POSIX shared memory

mod channel;
mod cli;
mod controller;
mod error;
mod logging;
mod paths;
mod theme;
mod version;
mod worker;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, RunArgs};
use theme::Themed;

/// Program entry point: parses CLI arguments, dispatches the selected command,
/// and handles top-level errors.
///
/// On error prints a colored error header followed by each cause in the error
/// chain before exiting with status code 1.
fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        theme::disable_colors();
    }
    logging::init(logging::LogConfig::from_verbosity(cli.verbose, cli.quiet).with_env_overrides());

    let result = match &cli.command {
        Commands::Run(args) => cmd_run(&cli, args),
        Commands::Worker(args) => worker::run_worker_main(&args.worker_config()),
        Commands::Completions(args) => {
            args.generate();
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".error_style(), e);
            // Print the error chain if there are causes
            for cause in e.chain().skip(1) {
                eprintln!("  {}: {}", "caused by".warning(), cause);
            }
            std::process::exit(1);
        }
    }
}

/// Run the interactive controller; the exit code reflects how the session ended.
fn cmd_run(cli: &Cli, args: &RunArgs) -> Result<i32> {
    let config = args.controller_config(cli.verbosity());
    let outcome = controller::run_controller(&config)?;
    Ok(outcome.exit_code())
}
