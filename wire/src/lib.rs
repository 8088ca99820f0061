//! Wire protocol framing, typed message fields, and handler dispatch for framelink.
//!
//! This crate is the in-memory encode/decode/dispatch pipeline of the
//! framelink transport: typed protocol fields compose into messages,
//! messages are framed for transmission over a byte stream, and decoded
//! messages are delivered to application handlers at their most specific
//! known type. Transport I/O is out of scope; everything operates on
//! caller-supplied byte buffers.
//!
//! ## Features
//!
//! - **Variant-Storage Fields**: numeric fields whose wire width follows
//!   an explicit storage mode (null / narrow sentinel / wide f64)
//! - **Zero-Copy Buffers**: `Bytes`/`BytesMut` throughout
//! - **Single-Frame Processing**: one frame per call, with a retry
//!   contract for partial input
//! - **Optional Checksums**: CRC32 payload trailer, flag-driven
//! - **Double Dispatch**: visitor-style handlers with a generic fallback
//!
//! ## Wire Format
//!
//! ```text
//! +--------------+----------------------------------------+
//! | u8  version  | must be 1                              |
//! | u8  flags    | bit0 CHECKSUM; bits 1-7 reserved, zero |
//! | u16 msg_id   | message-type identifier                |
//! | u32 body_len | payload length in bytes                |
//! +--------------+----------------------------------------+
//! | payload      | message fields in declaration order    |
//! +--------------+----------------------------------------+
//! | u32 crc32    | over payload, iff CHECKSUM flag        |
//! +--------------+----------------------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod error;
pub mod field;
pub mod frame;
pub mod message;

// Re-export main types
pub use dispatch::{decode_message, AnyMessage, Handler};
pub use error::WireError;
pub use field::{FieldError, NonFinite, RangeField, ScalarField, StorageMode};
pub use frame::{
    hex_dump, EnvFlags, Envelope, Frame, CHECKSUM_SIZE, DEFAULT_MAX_FRAME_SIZE, ENVELOPE_SIZE,
    HARD_MAX_FRAME_SIZE, WIRE_VERSION,
};
pub use message::{Message, MsgId, RangeMsg, SampleMsg, RANGE_MSG_ID, SAMPLE_MSG_ID};
