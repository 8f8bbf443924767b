//! Frame encoding for the shared channel.
//!
//! The region's leading `u32` doubles as payload length and message type:
//! `0` means idle, `u32::MAX` means terminate, anything else is the size of
//! the payload that follows.

/// Wire value for an idle channel.
pub const EMPTY_LENGTH: u32 = 0;

/// Wire value for a terminate request.
pub const TERMINATE_LENGTH: u32 = u32::MAX;

/// The message currently occupying the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Nothing to read.
    Empty,
    /// Raw text written by the other side.
    Payload(Vec<u8>),
    /// Shut down; carries no data.
    Terminate,
}

/// The control state encoded in the length field, without the payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Empty,
    /// A payload of the given length is present.
    Payload(usize),
    Terminate,
}

impl FrameState {
    /// Decode a raw length field.
    pub fn from_wire(length: u32) -> Self {
        match length {
            EMPTY_LENGTH => Self::Empty,
            TERMINATE_LENGTH => Self::Terminate,
            len => Self::Payload(len as usize),
        }
    }
}
