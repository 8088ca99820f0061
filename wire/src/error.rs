//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors.
///
/// Every fallible frame operation reports one of these; a completed
/// operation is `Ok(())`. The set is closed on purpose: callers match
/// exhaustively to pick a recovery strategy (accumulate more bytes,
/// grow the limit, or discard the frame).
#[derive(Error, Debug)]
pub enum WireError {
    /// Incomplete frame (need more data)
    #[error("not enough data")]
    NotEnoughData,

    /// Frame would exceed the configured size limit on write
    #[error("frame size {0} exceeds limit")]
    BufferOverflow(usize),

    /// Message identifier not known to the registry
    #[error("unknown message id {0}")]
    InvalidMsgId(u16),

    /// Structurally invalid envelope (version, reserved bits, checksum)
    #[error("corrupted frame")]
    Corrupted,

    /// Payload does not decode as the identified message's fields
    #[error("invalid message data")]
    InvalidMsgData,
}

impl WireError {
    /// True when the caller can retry the same call after supplying
    /// more input bytes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WireError::NotEnoughData)
    }
}
