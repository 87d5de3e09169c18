//! Constants used across the link-layer protocol implementation.
//!
//! This module defines the protocol-wide constants used for frame sizing,
//! preamble/sync framing, buffer capacities, and the acknowledgment timeout.
//!
//! These values match the wire format of the original home-automation node
//! protocol: a short training preamble, a single sync byte, a four byte
//! header, and a payload bounded at 30 bytes (including the trailing CRC).
//!
//! ## Key Concepts
//!
//! - **Preamble**: alternating-bit bytes transmitted first so the receiver's
//!   software PLL can acquire bit lock before any header field is read.
//! - **Sync**: a single byte marking the true start of the header. Detected
//!   by a sliding matcher, so no external byte alignment is required.
//! - **Payload Limits**: the frame `length` field counts payload bytes plus
//!   the CRC byte and is bounded by [`FRAME_DATA_CAPACITY`]. A received
//!   length outside these bounds is never trusted to size a buffer.
//! - **Receive Ring**: completed frames wait in a ring of [`MAX_FRAME`]
//!   slots until the application polls them out.

/// Capacity of the receive ring, in fully decoded frames.
///
/// A frame that completes while the ring is full is dropped; the missing
/// acknowledgment forces the sender to retry, which applies back-pressure
/// without ever evicting an undelivered frame.
pub const MAX_FRAME: usize = 2;

/// Capacity of a frame's `data` array and the upper bound of its `length`
/// field. `length` counts the used payload bytes plus the trailing CRC
/// byte, so the usable payload is at most `FRAME_DATA_CAPACITY - 1` bytes.
pub const FRAME_DATA_CAPACITY: usize = 30;

/// Length (in bytes) of the frame header: receptor, sender, type, length.
pub const FRAME_HEADER_LEN: usize = 4;

/// Maximum size (in bytes) of a frame on the wire after the sync byte:
/// header plus payload plus CRC.
pub const WIRE_MAX_LEN: usize = FRAME_HEADER_LEN + FRAME_DATA_CAPACITY;

/// The byte repeated to form the training preamble.
///
/// Alternating bits give the receiver PLL a transition every bit period,
/// which is the fastest way to pull its phase estimate onto the sender's
/// bit clock.
pub const PREAMBLE_BYTE: u8 = 0xAA;

/// Number of preamble bytes transmitted before the sync byte.
pub const PREAMBLE_LEN: usize = 4;

/// The sync byte transmitted between the preamble and the header.
///
/// Chosen so that no 8-bit window spanning the preamble tail and the sync
/// prefix can match it early; the sliding matcher therefore fires exactly
/// at the header boundary.
pub const SYNC_BYTE: u8 = 0xD3;

/// Maximum size (in bytes) of the full transmit image: preamble, sync byte,
/// and the largest possible frame.
pub const TX_BUF_LEN: usize = PREAMBLE_LEN + 1 + WIRE_MAX_LEN;

/// How many bit periods the receiver will slide past a matched preamble
/// while looking for the sync byte before giving up and reacquiring.
pub const SYNC_SEARCH_BITS: u8 = 48;

/// Number of consecutive bit periods without a signal transition after
/// which an in-progress assembly is abandoned as channel idle.
pub const QUIET_RESET_BITS: u8 = 32;

/// Receptor id addressing every node; also the id reserved for the master.
pub const BROADCAST_ID: u8 = 0;

/// Ticks to wait for an acknowledgment after a transmission completes
/// before the attempt is reported as timed out.
pub const ACK_TIMEOUT_TICKS: u16 = 250;
