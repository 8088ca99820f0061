//! Protocol messages.
//!
//! A message is a named, ordered collection of fields. The field set is
//! fixed by the message type; fields serialize in declaration order, and
//! equality is field-wise. Concrete messages implement [`Message`], the
//! capability the frame layer works against.

use bytes::{Bytes, BytesMut};

use crate::field::{RangeField, ScalarField};
use crate::WireError;

/// Message-type identifier carried in the frame envelope.
pub type MsgId = u16;

/// Identifier of [`SampleMsg`].
pub const SAMPLE_MSG_ID: MsgId = 1;

/// Identifier of [`RangeMsg`].
pub const RANGE_MSG_ID: MsgId = 2;

/// Capability shared by every concrete message type.
///
/// `encode_payload` and `decode_payload` walk the fields in declaration
/// order; the order is part of the wire contract. Neither touches the
/// envelope, which belongs to the frame layer.
pub trait Message {
    /// The message-type identifier.
    fn msg_id(&self) -> MsgId;

    /// Human-readable message name for logs.
    fn name(&self) -> &'static str;

    /// Encoded payload length in bytes for the current field states.
    fn payload_len(&self) -> usize;

    /// Serialize all fields into the buffer.
    fn encode_payload(&self, buf: &mut BytesMut) -> Result<(), WireError>;

    /// Reconstruct all fields from the buffer, consuming their bytes.
    fn decode_payload(&mut self, buf: &mut Bytes) -> Result<(), WireError>;
}

/// A telemetry sample carrying one variant-storage scalar reading.
///
/// Default construction leaves the reading null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMsg {
    reading: ScalarField,
}

impl SampleMsg {
    /// Create a message with a null reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reading field.
    pub fn reading(&self) -> &ScalarField {
        &self.reading
    }

    /// Mutable access to the reading field.
    pub fn reading_mut(&mut self) -> &mut ScalarField {
        &mut self.reading
    }
}

impl Message for SampleMsg {
    fn msg_id(&self) -> MsgId {
        SAMPLE_MSG_ID
    }

    fn name(&self) -> &'static str {
        "Sample"
    }

    fn payload_len(&self) -> usize {
        self.reading.encoded_len()
    }

    fn encode_payload(&self, buf: &mut BytesMut) -> Result<(), WireError> {
        self.reading.encode(buf);
        Ok(())
    }

    fn decode_payload(&mut self, buf: &mut Bytes) -> Result<(), WireError> {
        self.reading = ScalarField::decode(buf)?;
        Ok(())
    }
}

/// A distance measurement message carrying one scaled range field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeMsg {
    range: RangeField,
}

impl RangeMsg {
    /// Create a message at zero distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// The range field.
    pub fn range(&self) -> &RangeField {
        &self.range
    }

    /// Mutable access to the range field.
    pub fn range_mut(&mut self) -> &mut RangeField {
        &mut self.range
    }
}

impl Message for RangeMsg {
    fn msg_id(&self) -> MsgId {
        RANGE_MSG_ID
    }

    fn name(&self) -> &'static str {
        "Range"
    }

    fn payload_len(&self) -> usize {
        self.range.encoded_len()
    }

    fn encode_payload(&self, buf: &mut BytesMut) -> Result<(), WireError> {
        self.range.encode(buf);
        Ok(())
    }

    fn decode_payload(&mut self, buf: &mut Bytes) -> Result<(), WireError> {
        self.range = RangeField::decode(buf)?;
        Ok(())
    }
}
