//! Message dispatch.
//!
//! Decoded messages reach the application through a [`Handler`]: a
//! visitor with one method per known message type plus a generic
//! fallback. The frame layer resolves the concrete type from the
//! envelope identifier via the read-only registry in [`decode_message`]
//! and invokes the matching handler method, so handlers never downcast.

use bytes::Bytes;

use crate::message::{Message, MsgId, RangeMsg, SampleMsg, RANGE_MSG_ID, SAMPLE_MSG_ID};
use crate::WireError;

/// Sink for decoded messages.
///
/// Override the methods for the message types you care about; anything
/// not overridden routes to [`Handler::handle_unrecognized`], which sees
/// the message through its base [`Message`] capability only.
///
/// Specialized methods take the message by value: ownership transfers to
/// the handler, which keeps it or drops it as it sees fit.
pub trait Handler {
    /// A [`SampleMsg`] arrived.
    fn handle_sample(&mut self, msg: SampleMsg) {
        self.handle_unrecognized(&msg);
    }

    /// A [`RangeMsg`] arrived.
    fn handle_range(&mut self, msg: RangeMsg) {
        self.handle_unrecognized(&msg);
    }

    /// Fallback for message types without a specialized override.
    fn handle_unrecognized(&mut self, _msg: &dyn Message) {}
}

/// A decoded message of any known type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyMessage {
    /// A telemetry sample
    Sample(SampleMsg),
    /// A distance measurement
    Range(RangeMsg),
}

impl AnyMessage {
    /// Deliver the message to its specialized handler method.
    pub fn dispatch(self, handler: &mut dyn Handler) {
        match self {
            AnyMessage::Sample(msg) => handler.handle_sample(msg),
            AnyMessage::Range(msg) => handler.handle_range(msg),
        }
    }

    /// The message viewed through its base capability.
    pub fn as_message(&self) -> &dyn Message {
        match self {
            AnyMessage::Sample(msg) => msg,
            AnyMessage::Range(msg) => msg,
        }
    }
}

/// Construct and decode the message registered under `id`.
///
/// This is the runtime's only type registry: a closed identifier-to-
/// constructor mapping, fixed at compile time and safe for concurrent
/// readers. Unknown identifiers report [`WireError::InvalidMsgId`];
/// leftover payload bytes after the fields decode report
/// [`WireError::InvalidMsgData`].
pub fn decode_message(id: MsgId, payload: &mut Bytes) -> Result<AnyMessage, WireError> {
    let decoded = match id {
        SAMPLE_MSG_ID => {
            let mut msg = SampleMsg::new();
            msg.decode_payload(payload)?;
            AnyMessage::Sample(msg)
        }
        RANGE_MSG_ID => {
            let mut msg = RangeMsg::new();
            msg.decode_payload(payload)?;
            AnyMessage::Range(msg)
        }
        _ => return Err(WireError::InvalidMsgId(id)),
    };

    if !payload.is_empty() {
        return Err(WireError::InvalidMsgData);
    }

    Ok(decoded)
}
