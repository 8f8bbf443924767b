//! Worker process main loop.
//!
//! This runs when `divchain worker <OUTPUT> <SHM> <SEM>` is invoked by the
//! controller. States: waiting → parsing → computing → reporting (back to
//! waiting) or faulted (exit), and stopped once the terminate sentinel is seen.

use super::compute::{Computation, chained_division, parse_numbers};
use super::protocol::Response;
use super::record::ResultLog;
use crate::channel::{ChannelNames, Frame, FrameState, Outbox, SharedChannel};
use crate::error::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Result log path.
    pub output: PathBuf,
    /// Shared resources to attach to.
    pub names: ChannelNames,
    /// Delay between channel polls.
    pub poll_interval: Duration,
}

/// How the worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The controller wrote the terminate sentinel.
    Stopped,
    /// A zero divisor escalated to a session shutdown.
    Faulted,
}

impl WorkerExit {
    pub fn code(self) -> i32 {
        match self {
            Self::Stopped => 0,
            Self::Faulted => 1,
        }
    }
}

/// What the waiting state picked up from the channel.
enum Job {
    Numbers(Vec<i64>),
    Terminate,
}

/// Open the result log, attach to the channel and serve requests.
pub fn run_worker(config: &WorkerConfig) -> Result<WorkerExit> {
    let mut log = ResultLog::create(&config.output)?;
    tracing::info!(output = %log.path().display(), "Worker started");

    let mut channel = SharedChannel::open(&config.names)?.with_poll_interval(config.poll_interval);
    worker_loop(&mut channel, &mut log)
}

/// Serve requests until terminated or faulted.
fn worker_loop(channel: &mut SharedChannel, log: &mut ResultLog) -> Result<WorkerExit> {
    let mut outbox = Outbox::new();

    loop {
        let job = channel.wait_for(|guard| {
            Ok(match guard.receive(&mut outbox) {
                Frame::Empty => None,
                Frame::Terminate => {
                    guard.clear();
                    Some(Job::Terminate)
                }
                // Already cleared by `receive`: the controller sees the job taken
                // while we compute outside the lock.
                Frame::Payload(bytes) => Some(Job::Numbers(parse_numbers(&bytes))),
            })
        })?;

        let numbers = match job {
            Job::Terminate => {
                tracing::info!("Terminate received, worker stopping");
                return Ok(WorkerExit::Stopped);
            }
            Job::Numbers(numbers) => numbers,
        };
        tracing::debug!(?numbers, "Request parsed");

        match chained_division(&numbers) {
            Computation::TooFewOperands => {
                tracing::debug!(count = numbers.len(), "Too few numbers");
                respond(channel, &mut outbox, &Response::TooFewNumbers)?;
            }
            Computation::Quotient { expression, value } => {
                log.record_quotient(&expression, value)?;
                tracing::info!(%expression, value, "Quotient recorded");
                respond(channel, &mut outbox, &Response::Result(value))?;
            }
            Computation::DivisionByZero { expression, index } => {
                log.record_division_by_zero(&expression)?;
                tracing::warn!(%expression, index, "Division by zero, shutting down session");
                respond(channel, &mut outbox, &Response::DivisionByZero)?;
                return Ok(WorkerExit::Faulted);
            }
        }
    }
}

/// Re-acquire the channel and post a response.
///
/// A terminate request that arrived meanwhile is left for the next poll
/// rather than overwritten.
fn respond(channel: &mut SharedChannel, outbox: &mut Outbox, response: &Response) -> Result<()> {
    let mut guard = channel.acquire()?;
    if guard.peek() == FrameState::Terminate {
        tracing::debug!("Terminate pending, dropping response");
        return guard.release();
    }
    guard.send(outbox, response.to_text().as_bytes())?;
    guard.release()
}

/// Run the worker subprocess main function.
///
/// Never returns: exits 0 when stopped, 1 on the division-by-zero escalation
/// or any runtime fault.
pub fn run_worker_main(config: &WorkerConfig) -> ! {
    match run_worker(config) {
        Ok(exit) => std::process::exit(exit.code()),
        Err(e) => {
            eprintln!("Worker error: {}", e);
            std::process::exit(1);
        }
    }
}
