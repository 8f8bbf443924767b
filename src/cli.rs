//! Command-line interface definitions using clap.

use crate::channel::ChannelNames;
use crate::controller::{ControllerConfig, Verbosity};
use crate::worker::WorkerConfig;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Chained integer division computed by a worker process over shared memory.
#[derive(Parser, Debug)]
#[command(name = "divchain")]
#[command(author, version, long_version = crate::version::long_version(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all diagnostics except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity {
            verbose: self.verbose,
            quiet: self.quiet,
            no_color: self.no_color,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a worker and divide the numbers you type.
    Run(RunArgs),

    /// Serve division requests on an existing channel (started by `run`).
    #[command(hide = true)]
    Worker(WorkerArgs),

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Arguments for the run command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// File the worker writes results to (prompted for when omitted).
    #[arg(short, long, env = "DIVCHAIN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Milliseconds between polls of the shared channel.
    #[arg(long, env = "DIVCHAIN_POLL_INTERVAL_MS", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Milliseconds to wait after starting the worker before the first prompt.
    #[arg(long, env = "DIVCHAIN_SETTLE_MS", default_value_t = 50)]
    pub settle_ms: u64,
}

impl RunArgs {
    pub fn controller_config(&self, verbosity: Verbosity) -> ControllerConfig {
        ControllerConfig {
            output: self.output.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle: Duration::from_millis(self.settle_ms),
            verbosity,
        }
    }
}

/// Arguments for the internal worker command.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Result log path.
    pub output: PathBuf,

    /// Shared memory object name.
    pub shm_name: String,

    /// Named semaphore name.
    pub sem_name: String,

    /// Milliseconds between polls of the shared channel.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,
}

impl WorkerArgs {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            output: self.output.clone(),
            names: ChannelNames::new(self.shm_name.clone(), self.sem_name.clone()),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Arguments for shell completions.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate and print completions to stdout.
    pub fn generate(&self) {
        clap_complete::generate(
            self.shell,
            &mut Cli::command(),
            "divchain",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["divchain", "run", "--output", "out.txt"]).unwrap();
        let verbosity = cli.verbosity();
        match cli.command {
            Commands::Run(args) => {
                let config = args.controller_config(verbosity);
                assert_eq!(config.output, Some(PathBuf::from("out.txt")));
                assert_eq!(config.poll_interval, Duration::from_millis(10));
                assert_eq!(config.settle, Duration::from_millis(50));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_rejects_zero_poll_interval() {
        let result = Cli::try_parse_from(["divchain", "run", "--poll-interval-ms", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_positionals() {
        let cli = Cli::try_parse_from([
            "divchain",
            "-vv",
            "worker",
            "results.txt",
            "/div_shm_42",
            "/div_sem_42",
            "--poll-interval-ms",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Worker(args) => {
                let config = args.worker_config();
                assert_eq!(config.output, PathBuf::from("results.txt"));
                assert_eq!(config.names, ChannelNames::for_pid(42));
                assert_eq!(config.poll_interval, Duration::from_millis(5));
            }
            _ => panic!("Expected Worker command"),
        }
    }

    #[test]
    fn test_worker_requires_all_positionals() {
        assert!(Cli::try_parse_from(["divchain", "worker", "results.txt", "/div_shm_1"]).is_err());
        assert!(
            Cli::try_parse_from(["divchain", "worker", "a", "b", "c", "extra"]).is_err()
        );
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["divchain", "-q", "-v", "run"]);
        assert!(result.is_err());
    }
}
