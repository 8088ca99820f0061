//! Typed protocol fields.
//!
//! This module defines the field types messages are composed of: the
//! variant-storage [`ScalarField`] whose wire width follows its active
//! storage mode, and the fixed-width scaled [`RangeField`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::WireError;

/// Field-level errors for value assignment.
#[derive(Error, Debug)]
pub enum FieldError {
    /// Field is in null storage and holds no value
    #[error("null storage holds no value")]
    NullStorage,

    /// Value cannot be represented by the active storage mode
    #[error("value {0} not representable in narrow storage")]
    NotRepresentable(f64),
}

/// Active storage mode of a [`ScalarField`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// No value present
    Null = 0x00,
    /// One-byte storage, non-finite sentinels only
    Narrow = 0x01,
    /// Eight-byte storage, full f64 range
    Wide = 0x02,
}

impl TryFrom<u8> for StorageMode {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(StorageMode::Null),
            0x01 => Ok(StorageMode::Narrow),
            0x02 => Ok(StorageMode::Wide),
            _ => Err(WireError::InvalidMsgData),
        }
    }
}

/// The non-finite sentinels representable by narrow storage.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonFinite {
    /// Quiet not-a-number
    NaN = 0x00,
    /// Positive infinity
    PosInf = 0x01,
    /// Negative infinity
    NegInf = 0x02,
}

impl NonFinite {
    /// The f64 this sentinel stands for.
    pub fn as_f64(self) -> f64 {
        match self {
            NonFinite::NaN => f64::NAN,
            NonFinite::PosInf => f64::INFINITY,
            NonFinite::NegInf => f64::NEG_INFINITY,
        }
    }

    /// Classify a number as one of the sentinels, if it is non-finite.
    pub fn classify(value: f64) -> Option<Self> {
        if value.is_nan() {
            Some(NonFinite::NaN)
        } else if value == f64::INFINITY {
            Some(NonFinite::PosInf)
        } else if value == f64::NEG_INFINITY {
            Some(NonFinite::NegInf)
        } else {
            None
        }
    }
}

impl TryFrom<u8> for NonFinite {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(NonFinite::NaN),
            0x01 => Ok(NonFinite::PosInf),
            0x02 => Ok(NonFinite::NegInf),
            _ => Err(WireError::InvalidMsgData),
        }
    }
}

/// Internal tagged storage. Exactly one variant is active; an invalid
/// mode/value combination is unrepresentable.
#[derive(Debug, Clone, Copy)]
enum Storage {
    Null,
    Narrow(NonFinite),
    Wide(f64),
}

/// A numeric field whose storage mode is switchable at runtime.
///
/// Wire layout: one mode tag byte, followed by the mode's payload.
///
/// ```text
/// +----------+----------------------------------+
/// | tag 0x00 | null, no payload                 |
/// | tag 0x01 | narrow, 1-byte sentinel code     |
/// | tag 0x02 | wide, 8-byte big-endian f64      |
/// +----------+----------------------------------+
/// ```
///
/// A freshly constructed field is null. Mode transitions are explicit:
/// switching into narrow storage yields the NaN sentinel (narrow storage
/// has no finite default), switching into wide storage yields `0.0`.
///
/// Assignment policy: [`ScalarField::set_value`] rejects values the
/// active mode cannot represent and leaves the field unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ScalarField {
    storage: Storage,
}

impl ScalarField {
    /// Create a field in null storage.
    pub fn new() -> Self {
        Self {
            storage: Storage::Null,
        }
    }

    /// Current storage mode.
    pub fn mode(&self) -> StorageMode {
        match self.storage {
            Storage::Null => StorageMode::Null,
            Storage::Narrow(_) => StorageMode::Narrow,
            Storage::Wide(_) => StorageMode::Wide,
        }
    }

    /// True when no value is present.
    pub fn is_null(&self) -> bool {
        self.mode() == StorageMode::Null
    }

    /// True when narrow storage is active.
    pub fn is_narrow(&self) -> bool {
        self.mode() == StorageMode::Narrow
    }

    /// True when wide storage is active.
    pub fn is_wide(&self) -> bool {
        self.mode() == StorageMode::Wide
    }

    /// True when the given mode is active.
    pub fn is_mode(&self, mode: StorageMode) -> bool {
        self.mode() == mode
    }

    /// Switch to null storage, discarding any value.
    pub fn set_null(&mut self) {
        self.storage = Storage::Null;
    }

    /// Switch to narrow storage. The field starts at the NaN sentinel.
    pub fn set_narrow(&mut self) {
        self.storage = Storage::Narrow(NonFinite::NaN);
    }

    /// Switch to wide storage. The field starts at `0.0`.
    pub fn set_wide(&mut self) {
        self.storage = Storage::Wide(0.0);
    }

    /// Switch to the given storage mode.
    ///
    /// Equivalent to the matching `set_null`/`set_narrow`/`set_wide`
    /// call; switching resets the value to the target mode's default.
    pub fn set_mode(&mut self, mode: StorageMode) {
        match mode {
            StorageMode::Null => self.set_null(),
            StorageMode::Narrow => self.set_narrow(),
            StorageMode::Wide => self.set_wide(),
        }
    }

    /// Read the field value.
    ///
    /// Null storage reads as NaN, narrow storage as its sentinel,
    /// wide storage as the stored number.
    pub fn value(&self) -> f64 {
        match self.storage {
            Storage::Null => f64::NAN,
            Storage::Narrow(sentinel) => sentinel.as_f64(),
            Storage::Wide(v) => v,
        }
    }

    /// Store a value under the current mode.
    ///
    /// Returns an error (and leaves the field unchanged) when the active
    /// mode cannot represent the value: null storage accepts nothing,
    /// narrow storage accepts only non-finite values.
    pub fn set_value(&mut self, value: f64) -> Result<(), FieldError> {
        match self.storage {
            Storage::Null => Err(FieldError::NullStorage),
            Storage::Narrow(_) => match NonFinite::classify(value) {
                Some(sentinel) => {
                    self.storage = Storage::Narrow(sentinel);
                    Ok(())
                }
                None => Err(FieldError::NotRepresentable(value)),
            },
            Storage::Wide(_) => {
                self.storage = Storage::Wide(value);
                Ok(())
            }
        }
    }

    /// Encoded length in bytes under the current mode.
    pub fn encoded_len(&self) -> usize {
        match self.storage {
            Storage::Null => 1,
            Storage::Narrow(_) => 2,
            Storage::Wide(_) => 9,
        }
    }

    /// Encode the field (big-endian) into the buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.mode() as u8);
        match self.storage {
            Storage::Null => {}
            Storage::Narrow(sentinel) => buf.put_u8(sentinel as u8),
            Storage::Wide(v) => buf.put_f64(v),
        }
    }

    /// Decode a field from the buffer, consuming its bytes.
    pub fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        if buf.is_empty() {
            return Err(WireError::NotEnoughData);
        }
        let mode = StorageMode::try_from(buf.get_u8())?;
        let storage = match mode {
            StorageMode::Null => Storage::Null,
            StorageMode::Narrow => {
                if buf.is_empty() {
                    return Err(WireError::NotEnoughData);
                }
                Storage::Narrow(NonFinite::try_from(buf.get_u8())?)
            }
            StorageMode::Wide => {
                if buf.len() < 8 {
                    return Err(WireError::NotEnoughData);
                }
                Storage::Wide(buf.get_f64())
            }
        };
        Ok(Self { storage })
    }
}

impl Default for ScalarField {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ScalarField {
    /// Mode and value must match. Two null fields are equal regardless of
    /// history, and two wide NaN values compare equal (storage equality,
    /// not IEEE comparison).
    fn eq(&self, other: &Self) -> bool {
        match (self.storage, other.storage) {
            (Storage::Null, Storage::Null) => true,
            (Storage::Narrow(a), Storage::Narrow(b)) => a == b,
            (Storage::Wide(a), Storage::Wide(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => false,
        }
    }
}

/// Ticks per millimetre of the range field's raw unit (10 µm).
const TICKS_PER_MM: f64 = 100.0;

/// Ticks per metre of the range field's raw unit.
const TICKS_PER_METER: f64 = 100_000.0;

/// A distance measurement stored as unsigned 10 µm ticks.
///
/// Wire layout: 4-byte big-endian u32. The raw tick count is exposed
/// directly and through two scaled views: millimetres and metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeField {
    raw: u32,
}

impl RangeField {
    /// Create a field at zero distance.
    pub fn new() -> Self {
        Self { raw: 0 }
    }

    /// Raw tick count (10 µm units).
    pub fn value(&self) -> u32 {
        self.raw
    }

    /// Set the raw tick count.
    pub fn set_value(&mut self, raw: u32) {
        self.raw = raw;
    }

    /// The distance in millimetres.
    pub fn scaled(&self) -> f64 {
        f64::from(self.raw) / TICKS_PER_MM
    }

    /// Set the distance in millimetres (rounded to the nearest tick).
    pub fn set_scaled(&mut self, millimeters: f64) {
        self.raw = (millimeters * TICKS_PER_MM).round() as u32;
    }

    /// The distance in metres.
    pub fn meters(&self) -> f64 {
        f64::from(self.raw) / TICKS_PER_METER
    }

    /// Set the distance in metres (rounded to the nearest tick).
    pub fn set_meters(&mut self, meters: f64) {
        self.raw = (meters * TICKS_PER_METER).round() as u32;
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        4
    }

    /// Encode the field (big-endian) into the buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.raw);
    }

    /// Decode a field from the buffer, consuming its bytes.
    pub fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        if buf.len() < 4 {
            return Err(WireError::NotEnoughData);
        }
        Ok(Self { raw: buf.get_u32() })
    }
}
