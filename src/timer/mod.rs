//! Timer and tick-loop utilities for the link driver.
//!
//! The protocol engine is clocked by [`LinkDriver::tick`](crate::driver::LinkDriver::tick)
//! at a fixed interval, several ticks per bit period. Two scheduling styles
//! are supported: an interrupt service routine guarded by
//! `critical_section::with` (`timer-isr` feature), or a busy delay loop
//! (`delay-loop` feature).
//!
//! Contains helpers for both:
//! - [`compute_ocr_value`] / [`const_ocr_value`]: OCR calculators for
//!   CTC-mode hardware timers
//! - [`ticks_per_bit`] / [`const_ticks_per_bit`]: tick-rate to bit-period
//!   conversion for initializing the driver
//! - `run_link_tick_loop` and `send_blocking` (feature `delay-loop`)
//! - `global_link_driver_setup`, `global_link_timer_tick`,
//!   `global_link_send`, `global_link_receive` and the
//!   `init_link_driver!` / `tick_link_timer!` macros (feature `timer-isr`)
//!
//! Common prescalers for a 16 MHz AVR and the default 2 kbps bit rate:
//!
//! | PRESCALER | OCR | Tick Interval | Ticks / Bit |
//! |-----------|-----|---------------|-------------|
//! |         8 | 125 |       62.5 µs |           8 |
//! |        64 | 125 |        500 µs |           1 |

use libm::round;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// Nominal on-air bit rate: 2 kilobits / second.
pub const BITS_PER_SECOND: u16 = 2_000;
/// One bit period at 2 kbps: 500 µs.
pub const MICROSECONDS_PER_BIT: f32 = 500.0;
/// One bit period at 2 kbps, in picoseconds (for exact const math).
pub const PICOSECONDS_PER_BIT: u64 = 500_000_000;
/// 1 microsecond = 1,000,000 picoseconds.
pub const PICOSECONDS_PER_MICROSECOND: u32 = 1_000_000;

/// Computes the OCR value for a CTC-mode timer.
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 8, 64, 256)
/// - `tick_us`: desired tick interval in microseconds (e.g., 62.5)
///
/// # Returns
/// - OCR value for OCRnA (rounded to the nearest integer)
/// - Number of ticks per bit (for initializing the `LinkDriver`)
pub fn compute_ocr_value(f_cpu: u32, prescaler: u32, tick_us: f32) -> (u16, u8) {
    let ticks_per_second = f_cpu as f32 / prescaler as f32;
    let ocr = round((ticks_per_second * (tick_us / 1_000_000.0)) as f64) as u16;
    let tpb = round((MICROSECONDS_PER_BIT / tick_us) as f64) as u8;
    (ocr, tpb)
}

/// Compile-time OCR value calculator.
///
/// Same contract as [`compute_ocr_value`], computed in integer picosecond
/// arithmetic so it can run in a `const` context.
pub const fn const_ocr_value(f_cpu: u32, prescaler: u32, tick_us: f32) -> (u16, u8) {
    let tick_ps = (tick_us as f64 * PICOSECONDS_PER_MICROSECOND as f64) as u64;
    let ocr = (f_cpu / prescaler) as u64 * tick_ps / 1_000_000_000_000;
    let tpb = PICOSECONDS_PER_BIT / tick_ps;
    (ocr as u16, tpb as u8)
}

/// Number of tick calls per bit period for a given tick interval.
///
/// # Arguments
/// - `tick_us`: tick interval in microseconds (e.g., 62.5)
pub fn ticks_per_bit(tick_us: f32) -> u8 {
    round((MICROSECONDS_PER_BIT / tick_us) as f64) as u8
}

/// Compile-time version of [`ticks_per_bit`].
pub const fn const_ticks_per_bit(tick_us: f32) -> u8 {
    let tick_ps = (tick_us as f64 * PICOSECONDS_PER_MICROSECOND as f64) as u64;
    (PICOSECONDS_PER_BIT / tick_ps) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_for_16mhz_avr() {
        assert_eq!(compute_ocr_value(16_000_000, 8, 62.5), (125, 8));
        assert_eq!(const_ocr_value(16_000_000, 8, 62.5), (125, 8));
    }

    #[test]
    fn test_ticks_per_bit_matches_const() {
        for &tick_us in &[62.5, 125.0, 250.0, 500.0] {
            assert_eq!(ticks_per_bit(tick_us), const_ticks_per_bit(tick_us));
        }
        assert_eq!(ticks_per_bit(62.5), 8);
        assert_eq!(const_ticks_per_bit(500.0), 1);
    }
}
