//! Message framing.
//!
//! The frame layer turns messages into wire bytes and back. Every frame
//! starts with a fixed 8-byte envelope, followed by the message payload
//! and an optional CRC32 trailer:
//!
//! ```text
//! +--------------+----------------------------------------+
//! | u8  version  | must be WIRE_VERSION                   |
//! | u8  flags    | bit0 CHECKSUM; bits 1-7 reserved, zero |
//! | u16 msg_id   | message-type identifier                |
//! | u32 body_len | payload length in bytes                |
//! +--------------+----------------------------------------+
//! | payload      | message fields in declaration order    |
//! +--------------+----------------------------------------+
//! | u32 crc32    | over payload, iff CHECKSUM flag        |
//! +--------------+----------------------------------------+
//! ```
//!
//! All multi-byte integers are big-endian.

use bitflags::bitflags;
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::dispatch::{decode_message, Handler};
use crate::message::{Message, MsgId};
use crate::WireError;

/// Wire protocol version.
pub const WIRE_VERSION: u8 = 1;

/// Envelope size in bytes.
pub const ENVELOPE_SIZE: usize = 8;

/// CRC32 trailer size in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// Default maximum frame size (64 KiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Hard maximum frame size limit (1 MiB).
pub const HARD_MAX_FRAME_SIZE: usize = 1024 * 1024;

bitflags! {
    /// Envelope flags bitmask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EnvFlags: u8 {
        /// A CRC32 trailer over the payload follows it
        const CHECKSUM = 1 << 0;
    }
}

/// Decoded frame envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Protocol version (must be [`WIRE_VERSION`])
    pub ver: u8,
    /// Envelope flags
    pub flags: EnvFlags,
    /// Message-type identifier
    pub msg_id: MsgId,
    /// Payload length in bytes
    pub body_len: u32,
}

impl Envelope {
    /// Create an envelope for the given message type and payload length.
    pub fn new(msg_id: MsgId, body_len: u32) -> Self {
        Self {
            ver: WIRE_VERSION,
            flags: EnvFlags::empty(),
            msg_id,
            body_len,
        }
    }

    /// Encode the envelope (big-endian) into the buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.ver);
        buf.put_u8(self.flags.bits());
        buf.put_u16(self.msg_id);
        buf.put_u32(self.body_len);
    }

    /// Parse an envelope from the front of `buf` without consuming it.
    ///
    /// Version mismatches and nonzero reserved flag bits are reported as
    /// [`WireError::Corrupted`].
    pub fn peek(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < ENVELOPE_SIZE {
            return Err(WireError::NotEnoughData);
        }

        let ver = buf[0];
        if ver != WIRE_VERSION {
            return Err(WireError::Corrupted);
        }

        let flags = EnvFlags::from_bits(buf[1]).ok_or(WireError::Corrupted)?;
        let msg_id = u16::from_be_bytes([buf[2], buf[3]]);
        let body_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

        Ok(Self {
            ver,
            flags,
            msg_id,
            body_len,
        })
    }

    /// Total on-wire frame size implied by this envelope.
    pub fn frame_len(&self) -> usize {
        let trailer = if self.flags.contains(EnvFlags::CHECKSUM) {
            CHECKSUM_SIZE
        } else {
            0
        };
        ENVELOPE_SIZE + self.body_len as usize + trailer
    }
}

/// Stateless frame engine.
///
/// Holds only configuration: the frame size limit and whether written
/// frames carry a CRC32 trailer. Reading honors the flag carried by each
/// incoming envelope regardless of the local write setting.
#[derive(Debug, Clone)]
pub struct Frame {
    max_frame_size: usize,
    checksum: bool,
}

impl Frame {
    /// Create a frame engine with default limits and no checksum trailer.
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            checksum: false,
        }
    }

    /// Set the frame size limit, clamped to [`HARD_MAX_FRAME_SIZE`].
    pub fn with_max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit.min(HARD_MAX_FRAME_SIZE);
        self
    }

    /// Enable or disable the CRC32 trailer on written frames.
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.checksum = enabled;
        self
    }

    /// Append the full wire representation of `msg` to `buf`.
    ///
    /// The frame size is computed up front; if it exceeds the configured
    /// limit, [`WireError::BufferOverflow`] is returned and nothing is
    /// written. The message is never mutated.
    pub fn write_message(&self, msg: &dyn Message, buf: &mut BytesMut) -> Result<(), WireError> {
        let body_len = msg.payload_len();
        let trailer = if self.checksum { CHECKSUM_SIZE } else { 0 };
        let total = ENVELOPE_SIZE + body_len + trailer;
        if total > self.max_frame_size {
            return Err(WireError::BufferOverflow(total));
        }

        // Payload goes through a scratch buffer so a failing field never
        // leaves a partial frame behind.
        let mut payload = BytesMut::with_capacity(body_len);
        msg.encode_payload(&mut payload)?;
        if payload.len() != body_len {
            return Err(WireError::InvalidMsgData);
        }

        let mut envelope = Envelope::new(msg.msg_id(), body_len as u32);
        if self.checksum {
            envelope.flags |= EnvFlags::CHECKSUM;
        }

        buf.reserve(total);
        envelope.encode(buf);
        buf.put_slice(&payload);
        if self.checksum {
            buf.put_u32(crc32fast::hash(&payload));
        }

        trace!(
            msg = msg.name(),
            id = msg.msg_id(),
            len = total,
            "frame written"
        );
        Ok(())
    }

    /// Consume one frame from the front of `buf`, reconstruct its
    /// message, and deliver it to `handler`.
    ///
    /// Exactly one frame is processed per call; bytes past it stay in the
    /// buffer. Outcomes:
    ///
    /// - [`WireError::NotEnoughData`]: the buffer holds an incomplete
    ///   frame and is left untouched; accumulate more bytes and retry.
    /// - [`WireError::Corrupted`] on a bad version or reserved flag bits,
    ///   or a `body_len` beyond the configured limit: the envelope cannot
    ///   be trusted, so the buffer is left untouched and the caller
    ///   decides how many bytes to discard.
    /// - Any other error: the offending frame has been consumed, so the
    ///   next call starts at the following frame. The handler is not
    ///   invoked; in particular an unknown identifier reports
    ///   [`WireError::InvalidMsgId`] without any dispatch.
    /// - `Ok(())`: the handler received the message exactly once through
    ///   its specialized method.
    pub fn process_input_data(
        &self,
        buf: &mut BytesMut,
        handler: &mut dyn Handler,
    ) -> Result<(), WireError> {
        let envelope = Envelope::peek(buf)?;
        if envelope.body_len as usize > self.max_frame_size {
            warn!(len = envelope.body_len, "frame exceeds size limit");
            return Err(WireError::Corrupted);
        }

        let frame_len = envelope.frame_len();
        if buf.len() < frame_len {
            return Err(WireError::NotEnoughData);
        }

        // The frame is structurally complete; consume it whatever happens
        // next so one bad frame cannot poison the ones behind it.
        buf.advance(ENVELOPE_SIZE);
        let mut payload = buf.split_to(envelope.body_len as usize).freeze();

        if envelope.flags.contains(EnvFlags::CHECKSUM) {
            let expected = buf.get_u32();
            let actual = crc32fast::hash(&payload);
            if actual != expected {
                warn!(expected, actual, "payload checksum mismatch");
                return Err(WireError::Corrupted);
            }
        }

        let decoded = decode_message(envelope.msg_id, &mut payload).map_err(|err| match err {
            // The full payload was present, so running out of bytes means
            // the payload does not match the message's field layout.
            WireError::NotEnoughData => WireError::InvalidMsgData,
            other => other,
        })?;

        trace!(
            msg = decoded.as_message().name(),
            id = envelope.msg_id,
            len = frame_len,
            "frame decoded"
        );
        decoded.dispatch(handler);
        Ok(())
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a read-only hex view of wire bytes for logs and debugging.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{RangeMsg, SampleMsg, SAMPLE_MSG_ID};

    /// Records every dispatch outcome.
    #[derive(Default)]
    struct Recorder {
        samples: Vec<SampleMsg>,
        ranges: Vec<RangeMsg>,
        fallbacks: usize,
    }

    impl Handler for Recorder {
        fn handle_sample(&mut self, msg: SampleMsg) {
            self.samples.push(msg);
        }

        fn handle_range(&mut self, msg: RangeMsg) {
            self.ranges.push(msg);
        }

        fn handle_unrecognized(&mut self, _msg: &dyn Message) {
            self.fallbacks += 1;
        }
    }

    fn sample(value: Option<f64>) -> SampleMsg {
        let mut msg = SampleMsg::new();
        if let Some(v) = value {
            msg.reading_mut().set_wide();
            msg.reading_mut().set_value(v).unwrap();
        }
        msg
    }

    #[test]
    fn test_envelope_encode_peek_roundtrip() {
        let mut envelope = Envelope::new(0x0102, 0x04050607);
        envelope.flags |= EnvFlags::CHECKSUM;

        let mut buf = BytesMut::new();
        envelope.encode(&mut buf);
        assert_eq!(buf.len(), ENVELOPE_SIZE);

        assert_eq!(Envelope::peek(&buf).unwrap(), envelope);
    }

    #[test]
    fn test_envelope_big_endian_layout() {
        let envelope = Envelope::new(0x0102, 0x0A0B0C0D);
        let mut buf = BytesMut::new();
        envelope.encode(&mut buf);

        assert_eq!(&buf[..], &[1, 0, 0x01, 0x02, 0x0A, 0x0B, 0x0C, 0x0D]);
    }

    #[test]
    fn test_roundtrip_null_reading() {
        let msg = sample(None);
        let frame = Frame::new();
        let mut buf = BytesMut::new();

        frame.write_message(&msg, &mut buf).unwrap();
        let mut handler = Recorder::default();
        frame.process_input_data(&mut buf, &mut handler).unwrap();

        assert!(buf.is_empty());
        assert_eq!(handler.samples, vec![msg]);
        assert!(handler.samples[0].reading().is_null());
    }

    #[test]
    fn test_roundtrip_wide_reading() {
        let msg = sample(Some(3.14));
        let frame = Frame::new();
        let mut buf = BytesMut::new();

        frame.write_message(&msg, &mut buf).unwrap();
        let mut handler = Recorder::default();
        frame.process_input_data(&mut buf, &mut handler).unwrap();

        assert_eq!(handler.samples, vec![msg]);
        assert_eq!(handler.samples[0].reading().value(), 3.14);
    }

    #[test]
    fn test_roundtrip_with_checksum() {
        let msg = sample(Some(-0.5));
        let frame = Frame::new().with_checksum(true);
        let mut buf = BytesMut::new();

        frame.write_message(&msg, &mut buf).unwrap();
        assert_eq!(buf.len(), ENVELOPE_SIZE + msg.payload_len() + CHECKSUM_SIZE);

        // Reader config does not matter; the envelope flag drives it.
        let mut handler = Recorder::default();
        Frame::new()
            .process_input_data(&mut buf, &mut handler)
            .unwrap();
        assert_eq!(handler.samples, vec![msg]);
    }

    #[test]
    fn test_range_roundtrip() {
        let mut msg = RangeMsg::new();
        msg.range_mut().set_meters(0.1);

        let frame = Frame::new();
        let mut buf = BytesMut::new();
        frame.write_message(&msg, &mut buf).unwrap();

        let mut handler = Recorder::default();
        frame.process_input_data(&mut buf, &mut handler).unwrap();

        assert_eq!(handler.ranges, vec![msg]);
        assert_eq!(handler.ranges[0].range().value(), 10000);
        assert_eq!(handler.ranges[0].range().scaled(), 100.0);
    }

    #[test]
    fn test_truncated_frame_then_retry() {
        let msg = sample(Some(7.0));
        let frame = Frame::new();
        let mut full = BytesMut::new();
        frame.write_message(&msg, &mut full).unwrap();

        let mut handler = Recorder::default();

        // Every strict prefix reports NotEnoughData and stays untouched.
        for cut in 0..full.len() {
            let mut truncated = BytesMut::from(&full[..cut]);
            let err = frame
                .process_input_data(&mut truncated, &mut handler)
                .unwrap_err();
            assert!(matches!(err, WireError::NotEnoughData));
            assert!(err.is_retryable());
            assert_eq!(&truncated[..], &full[..cut]);
        }
        assert!(handler.samples.is_empty());

        // The untruncated buffer then decodes successfully.
        frame.process_input_data(&mut full, &mut handler).unwrap();
        assert_eq!(handler.samples, vec![msg]);
    }

    #[test]
    fn test_unknown_id_skips_dispatch_and_frame() {
        let frame = Frame::new();
        let mut buf = BytesMut::new();
        frame.write_message(&sample(None), &mut buf).unwrap();
        frame.write_message(&sample(Some(1.0)), &mut buf).unwrap();

        // Corrupt only the identifier of the first frame.
        buf[2] = 0x77;
        buf[3] = 0x77;

        let mut handler = Recorder::default();
        let err = frame.process_input_data(&mut buf, &mut handler).unwrap_err();
        assert!(matches!(err, WireError::InvalidMsgId(0x7777)));
        assert_eq!(handler.samples.len(), 0);
        assert_eq!(handler.fallbacks, 0);

        // The offending frame was consumed; the next one still decodes.
        frame.process_input_data(&mut buf, &mut handler).unwrap();
        assert_eq!(handler.samples, vec![sample(Some(1.0))]);
    }

    #[test]
    fn test_bad_version_leaves_buffer_untouched() {
        let frame = Frame::new();
        let mut buf = BytesMut::new();
        frame.write_message(&sample(None), &mut buf).unwrap();
        buf[0] = 9;

        let before = buf.clone();
        let mut handler = Recorder::default();
        let err = frame.process_input_data(&mut buf, &mut handler).unwrap_err();
        assert!(matches!(err, WireError::Corrupted));
        assert_eq!(buf, before);
    }

    #[test]
    fn test_reserved_flag_bits_rejected() {
        let frame = Frame::new();
        let mut buf = BytesMut::new();
        frame.write_message(&sample(None), &mut buf).unwrap();
        buf[1] = 0x80;

        let mut handler = Recorder::default();
        assert!(matches!(
            frame.process_input_data(&mut buf, &mut handler),
            Err(WireError::Corrupted)
        ));
    }

    #[test]
    fn test_oversize_body_len_rejected() {
        let envelope = Envelope::new(SAMPLE_MSG_ID, (DEFAULT_MAX_FRAME_SIZE + 1) as u32);
        let mut buf = BytesMut::new();
        envelope.encode(&mut buf);

        let mut handler = Recorder::default();
        assert!(matches!(
            Frame::new().process_input_data(&mut buf, &mut handler),
            Err(WireError::Corrupted)
        ));
        assert_eq!(buf.len(), ENVELOPE_SIZE);
    }

    #[test]
    fn test_checksum_mismatch_consumes_frame() {
        let frame = Frame::new().with_checksum(true);
        let mut buf = BytesMut::new();
        frame.write_message(&sample(Some(2.0)), &mut buf).unwrap();
        frame.write_message(&sample(Some(4.0)), &mut buf).unwrap();

        // Flip one payload byte of the first frame.
        buf[ENVELOPE_SIZE + 1] ^= 0xFF;

        let mut handler = Recorder::default();
        assert!(matches!(
            frame.process_input_data(&mut buf, &mut handler),
            Err(WireError::Corrupted)
        ));
        assert!(handler.samples.is_empty());

        frame.process_input_data(&mut buf, &mut handler).unwrap();
        assert_eq!(handler.samples, vec![sample(Some(4.0))]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_payload_field_underrun_is_invalid_msg_data() {
        // Envelope claims a one-byte payload: a wide-mode tag with no
        // f64 behind it.
        let envelope = Envelope::new(SAMPLE_MSG_ID, 1);
        let mut buf = BytesMut::new();
        envelope.encode(&mut buf);
        buf.put_u8(0x02);

        let mut handler = Recorder::default();
        assert!(matches!(
            Frame::new().process_input_data(&mut buf, &mut handler),
            Err(WireError::InvalidMsgData)
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_overflow_writes_nothing() {
        let frame = Frame::new().with_max_frame_size(ENVELOPE_SIZE);
        let mut buf = BytesMut::new();

        let err = frame.write_message(&sample(None), &mut buf).unwrap_err();
        assert!(matches!(err, WireError::BufferOverflow(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_one_frame_per_call() {
        let frame = Frame::new();
        let mut buf = BytesMut::new();
        frame.write_message(&sample(Some(1.0)), &mut buf).unwrap();
        frame.write_message(&sample(Some(2.0)), &mut buf).unwrap();

        let mut handler = Recorder::default();
        frame.process_input_data(&mut buf, &mut handler).unwrap();
        assert_eq!(handler.samples.len(), 1);
        assert!(!buf.is_empty());

        frame.process_input_data(&mut buf, &mut handler).unwrap();
        assert_eq!(handler.samples.len(), 2);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_does_not_disturb_existing_bytes() {
        let frame = Frame::new();
        let mut buf = BytesMut::new();
        buf.put_slice(b"prefix");

        frame.write_message(&sample(None), &mut buf).unwrap();
        assert_eq!(&buf[..6], b"prefix");
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0x01, 0xAB, 0x00]), "01 ab 00");
    }
}
