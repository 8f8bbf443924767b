//! Interactive relay loop between the user and the worker.

use super::input::{InputLine, classify, read_line};
use super::proc::WorkerProcess;
use crate::channel::{Frame, Outbox, SharedChannel};
use crate::error::Result;
use crate::worker::is_terminating;
use std::io::{BufRead, Write};

/// Why the interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Blank line, end of input, or a line rejected by input policy.
    UserStopped,
    /// The worker announced it is shutting both processes down.
    WorkerShutdown,
    /// The worker went away without announcing anything.
    WorkerExited,
}

/// What the wait after a request turned up.
enum Awaited {
    Response(Vec<u8>),
    WorkerGone,
}

/// One interactive session over an already-created channel.
pub struct Session<'a, R, W, P> {
    channel: &'a mut SharedChannel,
    worker: &'a mut P,
    input: R,
    output: W,
    outbox: Outbox,
}

impl<'a, R, W, P> Session<'a, R, W, P>
where
    R: BufRead,
    W: Write,
    P: WorkerProcess,
{
    pub fn new(channel: &'a mut SharedChannel, worker: &'a mut P, input: R, output: W) -> Self {
        Self {
            channel,
            worker,
            input,
            output,
            outbox: Outbox::new(),
        }
    }

    /// Relay lines to the worker and responses back until the session ends.
    pub fn run(mut self) -> Result<SessionEnd> {
        loop {
            if let Some(end) = self.drain()? {
                return Ok(end);
            }

            if self.worker.has_exited() {
                tracing::info!("Worker exited, ending session");
                return Ok(SessionEnd::WorkerExited);
            }

            write!(self.output, "> ")?;
            self.output.flush()?;

            let line = read_line(&mut self.input)?;
            match classify(&line) {
                InputLine::Eof => {
                    writeln!(self.output)?;
                    return Ok(SessionEnd::UserStopped);
                }
                InputLine::Blank => {
                    writeln!(self.output, "Empty line entered. Shutting down.")?;
                    return Ok(SessionEnd::UserStopped);
                }
                InputLine::Invalid => {
                    writeln!(
                        self.output,
                        "Error: input contains invalid characters. Shutting down."
                    )?;
                    return Ok(SessionEnd::UserStopped);
                }
                InputLine::TooLong(len) => {
                    eprintln!(
                        "error: input of {} bytes does not fit in one frame. Shutting down.",
                        len
                    );
                    return Ok(SessionEnd::UserStopped);
                }
                InputLine::Request(bytes) => {
                    {
                        let mut guard = self.channel.acquire()?;
                        guard.send(&mut self.outbox, &bytes)?;
                        guard.release()?;
                    }
                    tracing::debug!(len = bytes.len(), "Request sent");

                    if let Some(end) = self.await_response()? {
                        return Ok(end);
                    }
                }
            }
        }
    }

    /// Forward a pending worker response, if any.
    fn drain(&mut self) -> Result<Option<SessionEnd>> {
        let frame = {
            let mut guard = self.channel.acquire()?;
            let frame = guard.receive(&mut self.outbox);
            if frame == Frame::Terminate {
                guard.clear();
            }
            guard.release()?;
            frame
        };
        match frame {
            Frame::Empty => Ok(None),
            Frame::Terminate => Ok(Some(SessionEnd::WorkerExited)),
            Frame::Payload(bytes) => self.forward(&bytes),
        }
    }

    /// Poll until the worker answers the outstanding request or exits.
    fn await_response(&mut self) -> Result<Option<SessionEnd>> {
        let Session {
            channel,
            worker,
            outbox,
            ..
        } = self;

        let awaited = channel.wait_for(|guard| {
            Ok(match guard.receive(outbox) {
                Frame::Payload(bytes) => Some(Awaited::Response(bytes)),
                Frame::Terminate => Some(Awaited::WorkerGone),
                Frame::Empty => worker.has_exited().then_some(Awaited::WorkerGone),
            })
        })?;

        match awaited {
            Awaited::Response(bytes) => self.forward(&bytes),
            // A response written just before exiting is still in the channel.
            Awaited::WorkerGone => Ok(Some(self.drain()?.unwrap_or(SessionEnd::WorkerExited))),
        }
    }

    /// Print a response verbatim and check it for the shutdown marker.
    fn forward(&mut self, bytes: &[u8]) -> Result<Option<SessionEnd>> {
        self.output.write_all(bytes)?;
        self.output.flush()?;

        if is_terminating(&String::from_utf8_lossy(bytes)) {
            tracing::warn!("Worker announced shutdown");
            return Ok(Some(SessionEnd::WorkerShutdown));
        }
        Ok(None)
    }
}
