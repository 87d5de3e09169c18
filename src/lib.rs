//! # nestlink
//!
//! A portable, no_std link-layer protocol stack for battery-powered
//! home-automation nodes over cheap OOK (on-off keying) radio modules.
//!
//! This crate implements the full node-side radio stack in software:
//! - `embedded-hal` traits for digital I/O and timing
//! - a software PLL for bit recovery and demodulation
//! - CRC-8 validated variable-length frames with typed payload values
//! - acknowledged delivery with a timed ACK wait
//! - LINK/RESET pairing persisted through a pluggable configuration store
//! - interrupt-safe shared-driver access with `critical-section`
//! - optional tick sources using either timer interrupts or blocking delay
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` for host-side testing |
//! | `delay-loop`          | Uses `embedded_hal::delay::DelayNs` for bit timing |
//! | `timer-isr` (default) | Uses `critical_section::with` for bit timing |
//! | `defmt-0-3`           | Derives `defmt::Format` on public types |
//! | `log`                 | Uses `log` for protocol events |
//!
//! ## Software Features
//!
//! - **Transmitter and receiver** in pure software (no UART or DMA)
//! - Preamble/sync framing, CRC-8 validation, half-duplex auto-ACK
//! - Typed payload values (bool, u8, u16, u24, half-precision float)
//! - Fully portable across AVR (e.g., Arduino Uno) and ARM Cortex-M targets
//! - Feature flags for interrupt-driven or blocking tick scheduling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nestlink::driver::LinkDriver;
//!
//! let mut driver = LinkDriver::new(tx_pin, rx_pin, store, 8, false);
//! loop {
//!     driver.tick(); // call at ~62.5 µs intervals
//!     if let Some(frame) = driver.receive() {
//!         // react to commands addressed to this node
//!     }
//! }
//! ```
//!
//! Or, use `run_link_tick_loop()` with a `DelayNs` implementation:
//!
//! ```rust,ignore
//! nestlink::timer::run_link_tick_loop(&mut driver, &mut delay, 63);
//! ```
//!
//! ## Integration Notes
//!
//! - Transmit and receive timing assume a ~2 kbps bit rate, sampled
//!   several times per bit (~62.5 µs per tick at 8 ticks per bit)
//! - Timing precision matters; hardware timer configuration is recommended
//!   for reliable reception
//! - Only one driver instance should be active at a time in
//!   interrupt-driven mode
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded
//! environments.

#![deny(
    bad_style,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

pub mod buffer;
pub mod config;
pub mod consts;
pub(crate) mod crc;
pub mod driver;
pub mod error;
pub mod frame;
pub mod pll;
pub mod timer;
pub mod value;
