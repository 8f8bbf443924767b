//! Worker process: answers chained-division requests over the shared channel.
//!
//! The worker attaches to a channel the controller created, polls it for
//! requests, and writes one response per request back into the same buffer.
//! Every computed or faulted request is appended to a result log.
//!
//! A zero divisor is not a per-request error: the worker logs it, announces
//! the shutdown to the controller, and exits with failure.

mod compute;
mod protocol;
mod record;
pub mod worker_main;

pub use protocol::is_terminating;
pub use worker_main::{WorkerConfig, run_worker_main};
