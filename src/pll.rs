//! Software PLL bit recovery and streaming frame assembly.
//!
//! This module reconstructs a bitstream from an unclocked, jitter-prone
//! OOK receiver by sampling the input several times per expected bit
//! period, nudging a phase accumulator toward observed signal transitions,
//! and latching one bit per period by majority vote. Each recovered bit is
//! fed straight into a small state machine that slides over the preamble
//! and sync pattern, bounds the length field, and accumulates the frame
//! body.
//!
//! [`SoftwarePll::update`] runs once per timer tick, to completion, in
//! O(1) and without allocating; it is safe to call from a timer interrupt.

use embedded_hal::digital::InputPin;
use heapless::Vec;

use crate::consts::{
    FRAME_DATA_CAPACITY, FRAME_HEADER_LEN, PREAMBLE_BYTE, QUIET_RESET_BITS, SYNC_BYTE,
    SYNC_SEARCH_BITS, WIRE_MAX_LEN,
};

/// Where the streaming decoder is within a frame.
///
/// The transitions are driven exclusively by recovered bits, so the same
/// machine runs identically under a live timer or a test harness feeding
/// synthetic levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Sliding over bits looking for a preamble byte.
    SeekingPreamble,
    /// Preamble seen; sliding a bounded window looking for the sync byte.
    SeekingSync,
    /// Sync matched; accumulating header bytes through the length field.
    ReadingLength,
    /// Length validated; accumulating exactly `length` body bytes.
    ReadingBody,
    /// A complete raw frame is waiting for pickup by the driver.
    Done,
}

/// A software phase-locked loop recovering bits from a sampled level input.
///
/// The PLL advances a phase ramp by a fixed step each tick. A detected
/// level transition adds a slightly smaller or larger step instead,
/// retarding or advancing the phase estimate proportionally, so a single
/// spurious edge cannot destroy lock. When the ramp wraps, the samples of
/// the elapsed bit period are resolved by majority vote into one bit.
#[derive(Debug)]
pub struct SoftwarePll {
    /// Sliding window of the most recently recovered bits, newest in the
    /// low bit, used by the preamble and sync matchers.
    bits: u16,

    /// Phase accumulator; wraps at `ramp_len` once per bit period.
    ramp: u16,

    /// High samples seen in the current bit period.
    integrator: u8,

    /// Previous sample, for edge detection.
    last_sample: bool,

    /// Phase units per bit period.
    ramp_len: u16,

    /// Ramp step when no transition is seen.
    ramp_inc: u16,

    /// Ramp step for a transition arriving earlier than expected.
    ramp_retard: u16,

    /// Ramp step for a transition arriving later than expected.
    ramp_advance: u16,

    /// High-sample count above which a period resolves to a one bit.
    threshold: u8,

    /// Whether the sampled level should be inverted before use.
    inverted: bool,

    state: RxState,

    /// Bits accumulated toward the byte currently being assembled.
    bit_count: u8,

    /// Bit periods spent searching for sync since the preamble matched.
    sync_window: u8,

    /// Consecutive bit periods without a transition.
    quiet_bits: u8,

    /// Whether the current bit period contained a transition.
    transition_seen: bool,

    /// Body bytes still expected before the frame is complete.
    body_remaining: u8,

    /// Raw header + body bytes of the frame being assembled.
    buf: Vec<u8, WIRE_MAX_LEN>,

    /// Assemblies abandoned because the received length field was out of
    /// bounds.
    pub bad: u16,
}

impl SoftwarePll {
    /// Creates a zeroed PLL sampling `ticks_per_bit` times per bit period.
    ///
    /// `inverted` flips the sampled level for receivers with active-low
    /// data output.
    pub fn new(ticks_per_bit: u8, inverted: bool) -> Self {
        let ramp_len = (ticks_per_bit as u16) * 20;
        let ramp_inc = ramp_len / ticks_per_bit as u16;
        let ramp_adjust = ramp_inc / 2 - 1;
        Self {
            bits: 0,
            ramp: 0,
            integrator: 0,
            last_sample: false,
            ramp_len,
            ramp_inc,
            ramp_retard: ramp_inc - ramp_adjust,
            ramp_advance: ramp_inc + ramp_adjust,
            threshold: ticks_per_bit / 2 + 1,
            inverted,
            state: RxState::SeekingPreamble,
            bit_count: 0,
            sync_window: 0,
            quiet_bits: 0,
            transition_seen: false,
            body_remaining: 0,
            buf: Vec::new(),
            bad: 0,
        }
    }

    /// Samples the input and advances the PLL by one tick.
    ///
    /// Must be called exactly once per timer tick while receiving. Runs in
    /// constant time and never allocates.
    pub fn update<RX: InputPin>(&mut self, rx: &mut RX) {
        let mut sample = rx.is_high().unwrap_or(false);
        if self.inverted {
            sample = !sample;
        }
        if sample {
            self.integrator += 1;
        }

        if sample != self.last_sample {
            // Transition: retard the phase estimate if the edge came early
            // in the period, advance it if late. Proportional, never a
            // hard reset.
            self.ramp += if self.ramp < self.ramp_len / 2 {
                self.ramp_retard
            } else {
                self.ramp_advance
            };
            self.last_sample = sample;
            self.transition_seen = true;
        } else {
            self.ramp += self.ramp_inc;
        }

        if self.ramp >= self.ramp_len {
            self.ramp -= self.ramp_len;
            let bit = self.integrator >= self.threshold;
            self.integrator = 0;

            if self.transition_seen {
                self.quiet_bits = 0;
            } else {
                self.quiet_bits = self.quiet_bits.saturating_add(1);
                if self.quiet_bits >= QUIET_RESET_BITS && self.mid_assembly() {
                    // Channel went idle under us; start over.
                    self.restart();
                }
            }
            self.transition_seen = false;

            self.process_bit(bit);
        }
    }

    /// Whether a complete raw frame is waiting in [`Self::frame_bytes`].
    pub fn frame_ready(&self) -> bool {
        self.state == RxState::Done
    }

    /// The assembled header + body bytes of a completed frame.
    ///
    /// Only meaningful while [`Self::frame_ready`] returns true.
    pub fn frame_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Abandons any in-progress or completed assembly and resumes searching
    /// for a preamble.
    pub fn restart(&mut self) {
        self.state = RxState::SeekingPreamble;
        self.bit_count = 0;
        self.sync_window = 0;
        self.body_remaining = 0;
        self.buf.clear();
    }

    fn mid_assembly(&self) -> bool {
        matches!(
            self.state,
            RxState::SeekingSync | RxState::ReadingLength | RxState::ReadingBody
        )
    }

    /// Feeds one recovered bit into the assembly state machine, MSB-first.
    fn process_bit(&mut self, bit: bool) {
        self.bits = (self.bits << 1) | bit as u16;
        let window = (self.bits & 0xFF) as u8;

        match self.state {
            RxState::SeekingPreamble => {
                // Either bit alignment of the alternating preamble counts.
                if window == PREAMBLE_BYTE || window == !PREAMBLE_BYTE {
                    self.state = RxState::SeekingSync;
                    self.sync_window = 0;
                }
            }
            RxState::SeekingSync => {
                if window == SYNC_BYTE {
                    self.state = RxState::ReadingLength;
                    self.bit_count = 0;
                    self.buf.clear();
                } else {
                    self.sync_window += 1;
                    if self.sync_window > SYNC_SEARCH_BITS {
                        self.state = RxState::SeekingPreamble;
                    }
                }
            }
            RxState::ReadingLength => {
                self.bit_count += 1;
                if self.bit_count == 8 {
                    self.bit_count = 0;
                    let _ = self.buf.push(window);
                    if self.buf.len() == FRAME_HEADER_LEN {
                        let length = self.buf[3];
                        // A corrupted length must never size a buffer.
                        if length == 0 || length as usize > FRAME_DATA_CAPACITY {
                            self.bad = self.bad.saturating_add(1);
                            self.restart();
                        } else {
                            self.body_remaining = length;
                            self.state = RxState::ReadingBody;
                        }
                    }
                }
            }
            RxState::ReadingBody => {
                self.bit_count += 1;
                if self.bit_count == 8 {
                    self.bit_count = 0;
                    let _ = self.buf.push(window);
                    self.body_remaining -= 1;
                    if self.body_remaining == 0 {
                        self.state = RxState::Done;
                    }
                }
            }
            // Hold the completed frame until the driver picks it up.
            RxState::Done => {}
        }
    }
}
