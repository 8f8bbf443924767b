//! Shared channel between the controller and the worker.
//!
//! One fixed-size POSIX shared memory region carries a single in-flight
//! message in either direction, and one named semaphore (initial value 1)
//! serialises every access to it.
//!
//! # Layout
//!
//! ```text
//!  0        4                                              4096
//!  ┌────────┬───────────────────────────────────────────────┐
//!  │ length │ payload (request text or response text)       │
//!  └────────┴───────────────────────────────────────────────┘
//!  length == 0          → empty
//!  length == u32::MAX   → terminate
//!  otherwise            → payload[..length] is meaningful
//! ```
//!
//! The region is only reachable through a [`ChannelGuard`], which holds the
//! semaphore for its lifetime and posts it on drop. Nothing signals "data
//! arrived"; both sides re-acquire and inspect the length on a fixed poll
//! interval via [`SharedChannel::wait_for`].

mod frame;
mod region;
mod semaphore;

pub use frame::{Frame, FrameState};
pub use region::ShmRegion;
pub use semaphore::NamedSemaphore;

use crate::error::{DivError, Result};
use std::time::Duration;

/// Total size of the shared region in bytes.
pub const REGION_SIZE: usize = 4096;

/// Bytes occupied by the length field at the start of the region.
pub const LENGTH_FIELD_SIZE: usize = std::mem::size_of::<u32>();

/// Largest payload a single frame can carry.
pub const PAYLOAD_CAPACITY: usize = REGION_SIZE - LENGTH_FIELD_SIZE;

/// Default delay between two polls of the channel.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Names of the two shared resources backing a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    pub shm: String,
    pub sem: String,
}

impl ChannelNames {
    pub fn new(shm: impl Into<String>, sem: impl Into<String>) -> Self {
        Self {
            shm: shm.into(),
            sem: sem.into(),
        }
    }

    /// Names qualified by a process id, unique per controller.
    pub fn for_pid(pid: u32) -> Self {
        Self::new(format!("/div_shm_{}", pid), format!("/div_sem_{}", pid))
    }
}

/// A shared region plus the semaphore that guards it.
pub struct SharedChannel {
    region: ShmRegion,
    sem: NamedSemaphore,
    poll_interval: Duration,
}

impl SharedChannel {
    /// Create and zero the region, then create the semaphore unlocked.
    ///
    /// The caller becomes the owner and is responsible for [`destroy`](Self::destroy).
    pub fn create(names: &ChannelNames) -> Result<Self> {
        let region = ShmRegion::create(&names.shm, REGION_SIZE)?;
        let sem = NamedSemaphore::create(&names.sem, 1)?;
        tracing::info!(shm = %names.shm, sem = %names.sem, "Shared channel created");
        Ok(Self {
            region,
            sem,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Attach to a channel created by another process.
    pub fn open(names: &ChannelNames) -> Result<Self> {
        let region = ShmRegion::open(&names.shm, REGION_SIZE)?;
        let sem = NamedSemaphore::open(&names.sem)?;
        tracing::info!(shm = %names.shm, sem = %names.sem, "Attached to shared channel");
        tracing::debug!(lock = ?sem.value().ok(), "Semaphore value at attach");
        Ok(Self {
            region,
            sem,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set the delay used between polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Block until the semaphore is obtained. No timeout.
    pub fn acquire(&mut self) -> Result<ChannelGuard<'_>> {
        self.sem.wait()?;
        Ok(ChannelGuard {
            channel: self,
            released: false,
        })
    }

    /// Sleep for one poll interval. Never call while holding a guard.
    pub fn pause(&self) {
        std::thread::sleep(self.poll_interval);
    }

    /// Poll the channel until `check` yields a value.
    ///
    /// Each attempt acquires the lock, runs `check` on the guard, releases,
    /// and sleeps one poll interval if `check` returned `None`.
    pub fn wait_for<T, F>(&mut self, mut check: F) -> Result<T>
    where
        F: FnMut(&mut ChannelGuard<'_>) -> Result<Option<T>>,
    {
        loop {
            let outcome = {
                let mut guard = self.acquire()?;
                let outcome = check(&mut guard)?;
                guard.release()?;
                outcome
            };
            if let Some(value) = outcome {
                return Ok(value);
            }
            self.pause();
        }
    }

    /// Write the terminate sentinel under the lock. Idempotent.
    pub fn signal_terminate(&mut self) -> Result<()> {
        let mut guard = self.acquire()?;
        guard.signal_terminate();
        guard.release()
    }

    /// Unmap and remove both resources from the system namespace.
    pub fn destroy(mut self) -> Result<()> {
        let removed = self.region.unlink().and(self.sem.unlink());
        if removed.is_ok() {
            tracing::info!(
                shm = %self.region.name(),
                sem = %self.sem.name(),
                "Shared channel removed"
            );
        }
        removed
    }
}

/// Tracks the last frame this side wrote until the peer consumes it.
///
/// Requests and responses share one buffer, so a non-empty length alone does
/// not say who wrote it. A payload byte-identical to our own unread frame is
/// treated as nothing to read; an empty channel or any other payload means
/// the peer has taken it.
#[derive(Debug, Default)]
pub struct Outbox {
    unread: Option<Vec<u8>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn sent(&mut self, bytes: &[u8]) {
        self.unread = Some(bytes.to_vec());
    }

    /// Hide our own unread frame; forget it once the channel shows otherwise.
    fn filter(&mut self, frame: Frame) -> Frame {
        match (&self.unread, &frame) {
            (Some(own), Frame::Payload(bytes)) if own == bytes => Frame::Empty,
            _ => {
                self.unread = None;
                frame
            }
        }
    }
}

/// Exclusive access to the channel while the semaphore is held.
///
/// Dropping the guard posts the semaphore, so every exit path releases it
/// exactly once.
pub struct ChannelGuard<'a> {
    channel: &'a mut SharedChannel,
    released: bool,
}

impl ChannelGuard<'_> {
    /// Raw length field.
    pub fn peek_length(&self) -> u32 {
        self.channel.region.read_u32()
    }

    /// Decoded control state, without copying the payload.
    pub fn peek(&self) -> FrameState {
        FrameState::from_wire(self.peek_length())
    }

    /// Copy out the current frame. Does not modify the channel.
    pub fn read(&self) -> Frame {
        match self.peek() {
            FrameState::Empty => Frame::Empty,
            FrameState::Terminate => Frame::Terminate,
            FrameState::Payload(len) => {
                let len = if len > PAYLOAD_CAPACITY {
                    tracing::warn!(len, capacity = PAYLOAD_CAPACITY, "Length field exceeds capacity");
                    PAYLOAD_CAPACITY
                } else {
                    len
                };
                Frame::Payload(self.channel.region.read_bytes(LENGTH_FIELD_SIZE, len))
            }
        }
    }

    /// Replace the channel contents with `bytes`.
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > PAYLOAD_CAPACITY {
            return Err(DivError::FrameTooLarge {
                len: bytes.len(),
                capacity: PAYLOAD_CAPACITY,
            });
        }
        let region = &mut self.channel.region;
        region.write_bytes(LENGTH_FIELD_SIZE, bytes);
        // Bounded by PAYLOAD_CAPACITY above, so never collides with a sentinel
        // except for an empty slice, which reads back as Empty.
        region.write_u32(bytes.len() as u32);
        Ok(())
    }

    /// Write `bytes` as this side's message and remember it in `outbox`.
    pub fn send(&mut self, outbox: &mut Outbox, bytes: &[u8]) -> Result<()> {
        self.write_frame(bytes)?;
        outbox.sent(bytes);
        Ok(())
    }

    /// Read a message written by the peer.
    ///
    /// A peer payload is copied out and the channel cleared, which tells the
    /// peer it was taken. Our own unread frame reads as [`Frame::Empty`] and
    /// is left in place, as is a terminate request.
    pub fn receive(&mut self, outbox: &mut Outbox) -> Frame {
        let frame = outbox.filter(self.read());
        if matches!(frame, Frame::Payload(_)) {
            self.clear();
        }
        frame
    }

    /// Mark the channel empty.
    pub fn clear(&mut self) {
        self.channel.region.write_u32(frame::EMPTY_LENGTH);
    }

    /// Mark the channel as a terminate request.
    pub fn signal_terminate(&mut self) {
        self.channel.region.write_u32(frame::TERMINATE_LENGTH);
    }

    /// Post the semaphore now, surfacing any error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.channel.sem.post()
    }
}

impl Drop for ChannelGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.channel.sem.post()
        {
            tracing::error!(error = %e, "Failed to release channel lock");
        }
    }
}
