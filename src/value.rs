//! Typed-value payload codec and half-precision float transform.
//!
//! Payload bytes inside a [`Frame`] are self-describing: each value is
//! packed as one tag byte followed by its big-endian value bytes, so the
//! receiver can walk a payload without an external schema.
//!
//! Measurement values (temperature, humidity) are carried as 32-bit floats
//! narrowed to IEEE-754 binary16 before packing and widened back on
//! extraction, halving their payload cost. The narrowing is a pure bit
//! transform: round-to-nearest-even, with out-of-range magnitudes
//! saturating to the largest finite half rather than overflowing to
//! infinity.

use crate::consts::FRAME_DATA_CAPACITY;
use crate::error::LinkError;
use crate::frame::{Frame, FrameType};

/// One typed value packed into a frame payload.
///
/// The closed set of representable types; the discriminant doubles as the
/// wire tag byte.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Value {
    /// On/off state, one byte on the wire.
    Bool(bool),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer, big-endian on the wire.
    U16(u16),
    /// Unsigned 24-bit integer in the low bits, big-endian on the wire.
    U24(u32),
    /// Measurement, carried as a 16-bit half-precision float.
    Float(f32),
}

impl Value {
    const TAG_BOOL: u8 = 0;
    const TAG_U8: u8 = 1;
    const TAG_U16: u8 = 2;
    const TAG_U24: u8 = 3;
    const TAG_FLOAT: u8 = 4;

    /// The wire tag byte identifying this value's type.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Bool(_) => Self::TAG_BOOL,
            Value::U8(_) => Self::TAG_U8,
            Value::U16(_) => Self::TAG_U16,
            Value::U24(_) => Self::TAG_U24,
            Value::Float(_) => Self::TAG_FLOAT,
        }
    }

    /// Number of value bytes following the tag on the wire.
    pub fn width(&self) -> usize {
        match self {
            Value::Bool(_) | Value::U8(_) => 1,
            Value::U16(_) | Value::Float(_) => 2,
            Value::U24(_) => 3,
        }
    }
}

impl Frame {
    /// Appends one tagged value to the frame's payload, widening `length`.
    ///
    /// Fails with [`LinkError::CapacityExceeded`] when the tag and value
    /// bytes would not fit in the remaining payload capacity.
    pub fn pack(&mut self, value: Value) -> Result<(), LinkError> {
        let used = self.length as usize - 1;
        let needed = 1 + value.width();
        // length (payload + crc) may never exceed the data capacity
        if used + needed + 1 > FRAME_DATA_CAPACITY {
            return Err(LinkError::CapacityExceeded);
        }

        let mut at = used;
        self.data[at] = value.tag();
        at += 1;
        match value {
            Value::Bool(b) => self.data[at] = b as u8,
            Value::U8(v) => self.data[at] = v,
            Value::U16(v) => self.data[at..at + 2].copy_from_slice(&v.to_be_bytes()),
            Value::U24(v) => {
                let be = (v & 0x00FF_FFFF).to_be_bytes();
                self.data[at..at + 3].copy_from_slice(&be[1..]);
            }
            Value::Float(f) => {
                self.data[at..at + 2].copy_from_slice(&float_to_half(f).to_be_bytes())
            }
        }
        self.length += needed as u8;
        Ok(())
    }

    /// Iterates over the values packed in this frame's payload.
    ///
    /// For command frames iteration starts after the leading command byte.
    /// An unknown tag or a truncated value yields
    /// `Err(`[`LinkError::InvalidFrame`]`)` and ends the iteration.
    pub fn values(&self) -> Values<'_> {
        let start = if self.frame_type == FrameType::Cmd && self.length >= 2 {
            1
        } else {
            0
        };
        Values {
            payload: self.payload(),
            at: start,
            poisoned: false,
        }
    }
}

/// Iterator over the typed values in a frame payload.
///
/// Returned by [`Frame::values`].
#[derive(Debug)]
pub struct Values<'a> {
    payload: &'a [u8],
    at: usize,
    poisoned: bool,
}

impl Iterator for Values<'_> {
    type Item = Result<Value, LinkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned || self.at >= self.payload.len() {
            return None;
        }
        let tag = self.payload[self.at];
        let rest = &self.payload[self.at + 1..];
        let parsed = match tag {
            Value::TAG_BOOL if !rest.is_empty() => Value::Bool(rest[0] != 0),
            Value::TAG_U8 if !rest.is_empty() => Value::U8(rest[0]),
            Value::TAG_U16 if rest.len() >= 2 => Value::U16(u16::from_be_bytes([rest[0], rest[1]])),
            Value::TAG_U24 if rest.len() >= 3 => {
                Value::U24(u32::from_be_bytes([0, rest[0], rest[1], rest[2]]))
            }
            Value::TAG_FLOAT if rest.len() >= 2 => {
                Value::Float(half_to_float(u16::from_be_bytes([rest[0], rest[1]])))
            }
            _ => {
                self.poisoned = true;
                return Some(Err(LinkError::InvalidFrame));
            }
        };
        self.at += 1 + parsed.width();
        Some(Ok(parsed))
    }
}

/// Narrows an IEEE-754 single-precision float to binary16 bits.
///
/// Round-to-nearest-even. Magnitudes above the half-precision range
/// (including infinities) saturate to the largest finite half, `±65504`;
/// NaN stays NaN. Values below the smallest subnormal flush to signed zero.
pub fn float_to_half(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x007F_FFFF;

    if exp == 0xFF {
        return if frac != 0 {
            sign | 0x7E00 // NaN
        } else {
            sign | 0x7BFF // infinity saturates
        };
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        return sign | 0x7BFF;
    }

    if unbiased >= -14 {
        // Normal half: keep 10 mantissa bits, round to nearest even.
        let mut mant = (frac >> 13) as u16;
        let rem = frac & 0x1FFF;
        if rem > 0x1000 || (rem == 0x1000 && mant & 1 == 1) {
            mant += 1;
        }
        let mut half_exp = (unbiased + 15) as u16;
        if mant == 0x400 {
            mant = 0;
            half_exp += 1;
            if half_exp > 30 {
                return sign | 0x7BFF;
            }
        }
        return sign | (half_exp << 10) | mant;
    }

    if unbiased < -25 {
        return sign; // underflows even the rounding of the smallest subnormal
    }

    // Subnormal half: shift the full 24-bit significand down, round to
    // nearest even. Rounding may carry into the smallest normal, which the
    // bit layout absorbs naturally.
    let full = frac | 0x0080_0000;
    let shift = (-unbiased - 1) as u32;
    let mut mant = (full >> shift) as u16;
    let lost = full & ((1 << shift) - 1);
    let half_point = 1 << (shift - 1);
    if lost > half_point || (lost == half_point && mant & 1 == 1) {
        mant += 1;
    }
    sign | mant
}

/// Widens binary16 bits back to a single-precision float.
///
/// Exact for every finite half value; the inverse of [`float_to_half`]
/// within the representable range.
pub fn half_to_float(bits: u16) -> f32 {
    let sign = ((bits as u32) & 0x8000) << 16;
    let exp = ((bits >> 10) & 0x1F) as u32;
    let mant = (bits & 0x03FF) as u32;

    let out = if exp == 0x1F {
        sign | 0x7F80_0000 | (mant << 13)
    } else if exp != 0 {
        sign | ((exp + 112) << 23) | (mant << 13)
    } else if mant == 0 {
        sign
    } else {
        // Subnormal half: renormalize around the leading mantissa bit.
        let msb = 31 - mant.leading_zeros();
        sign | ((msb + 103) << 23) | ((mant << (23 - msb)) & 0x007F_FFFF)
    };
    f32::from_bits(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameType;

    #[test]
    fn test_pack_and_extract_every_variant() {
        let mut frame = Frame::new(1, 2, FrameType::State);
        frame.pack(Value::Bool(true)).unwrap();
        frame.pack(Value::U8(0xAB)).unwrap();
        frame.pack(Value::U16(0xBEEF)).unwrap();
        frame.pack(Value::U24(0x01_2345)).unwrap();
        frame.pack(Value::Float(21.5)).unwrap();

        let got: Result<heapless::Vec<Value, 8>, LinkError> = frame.values().collect();
        let got = got.unwrap();
        assert_eq!(
            &got[..4],
            &[
                Value::Bool(true),
                Value::U8(0xAB),
                Value::U16(0xBEEF),
                Value::U24(0x01_2345),
            ]
        );
        assert_eq!(got[4], Value::Float(21.5)); // 21.5 is half-exact
    }

    #[test]
    fn test_cmd_payload_skips_command_byte() {
        let mut frame = Frame::new(4, 0, FrameType::Cmd);
        frame.push_command(crate::frame::Command::Set).unwrap();
        frame.pack(Value::U8(9)).unwrap();

        let mut values = frame.values();
        assert_eq!(values.next(), Some(Ok(Value::U8(9))));
        assert_eq!(values.next(), None);
    }

    #[test]
    fn test_pack_reports_capacity_exceeded() {
        let mut frame = Frame::new(1, 2, FrameType::State);
        // 6 × (tag + 3 bytes) = 24 payload bytes; with the CRC, length 25.
        for _ in 0..6 {
            frame.pack(Value::U24(1)).unwrap();
        }
        assert_eq!(frame.length, 25);
        frame.pack(Value::U16(1)).unwrap(); // 28
        frame.pack(Value::Bool(false)).unwrap(); // exactly full
        assert_eq!(frame.length as usize, FRAME_DATA_CAPACITY);
        assert_eq!(frame.pack(Value::Bool(true)), Err(LinkError::CapacityExceeded));
        // the frame is still usable after a rejected pack
        assert_eq!(frame.values().count(), 8);
    }

    #[test]
    fn test_unknown_tag_poisons_iteration() {
        let mut frame = Frame::new(1, 2, FrameType::State);
        frame.data[0] = 0x77;
        frame.length = 2;
        let mut values = frame.values();
        assert_eq!(values.next(), Some(Err(LinkError::InvalidFrame)));
        assert_eq!(values.next(), None);
    }

    #[test]
    fn test_truncated_value_is_invalid() {
        let mut frame = Frame::new(1, 2, FrameType::State);
        frame.data[0] = 2; // U16 tag with only one byte following
        frame.data[1] = 0xFF;
        frame.length = 3;
        assert_eq!(frame.values().next(), Some(Err(LinkError::InvalidFrame)));
    }

    #[test]
    fn test_half_round_trip_exact_values() {
        for x in [0.0f32, -0.0, 1.0, -1.0, 0.5, 21.5, -40.0, 65504.0, 0.0009765625] {
            assert_eq!(half_to_float(float_to_half(x)), x, "{x} not exact");
        }
    }

    #[test]
    fn test_half_round_trip_within_precision_bound() {
        for x in [22.7f32, -17.3, 55.3, 99.9, 0.123, 3.14159] {
            let rt = half_to_float(float_to_half(x));
            // binary16 keeps 11 significant bits
            let bound = x.abs() * (1.0 / 1024.0);
            assert!((rt - x).abs() <= bound, "{x} -> {rt} outside bound");
        }
    }

    #[test]
    fn test_half_saturates_instead_of_wrapping() {
        assert_eq!(half_to_float(float_to_half(1.0e9)), 65504.0);
        assert_eq!(half_to_float(float_to_half(-1.0e9)), -65504.0);
        assert_eq!(half_to_float(float_to_half(f32::INFINITY)), 65504.0);
        assert_eq!(half_to_float(float_to_half(65520.0)), 65504.0);
    }

    #[test]
    fn test_half_subnormals_and_underflow() {
        let smallest_subnormal = half_to_float(0x0001);
        assert_eq!(float_to_half(smallest_subnormal), 0x0001);
        assert_eq!(float_to_half(1.0e-10), 0x0000);
        assert_eq!(float_to_half(-1.0e-10), 0x8000);
        assert!(half_to_float(float_to_half(f32::NAN)).is_nan());
    }
}
