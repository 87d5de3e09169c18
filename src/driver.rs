//! Link-layer protocol engine for home-automation radio nodes.
//!
//! This module provides the [`LinkDriver`] struct, which ties the software
//! PLL sampler, the frame codec, and the receive ring together into the
//! node-side protocol: acknowledged sends with a timed wait, receive-side
//! filtering and auto-acknowledgment, and LINK/RESET identity handling
//! backed by an external [`ConfigStore`].
//!
//! The driver operates independently of the target platform's clock speed,
//! provided that [`tick()`](LinkDriver::tick) is called at a fixed interval
//! of several ticks per bit period — from a timer interrupt (see
//! [`crate::timer`]) or a blocking delay loop.
//!
//! ## Execution contexts
//!
//! Exactly two contexts touch a driver: the tick context (runs `tick()`
//! once per timer period, O(1), allocation-free) and the polling context
//! (runs [`send`](LinkDriver::send), [`poll_send`](LinkDriver::poll_send),
//! [`receive`](LinkDriver::receive), and the user callback). The callback
//! is always invoked from the polling context, never from the tick path.
//! In `timer-isr` builds the driver lives inside a
//! `critical_section::Mutex` and every mainline access is a short critical
//! section; see [`crate::timer`] for the helpers.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! use nestlink::config::VolatileStore;
//! use nestlink::driver::LinkDriver;
//!
//! # let tx_pin = Pin::new(&[PinTransaction::set(PinState::Low)]);
//! # let rx_pin = Pin::new(&[PinTransaction::get(PinState::Low)]);
//! let mut driver: LinkDriver<Pin, Pin, VolatileStore> =
//!     LinkDriver::new(tx_pin, rx_pin, VolatileStore::default(), 8, false);
//!
//! loop {
//!     driver.tick(); // called at the tick rate by a timer or delay loop
//!     # break;
//! }
//! # driver.tx.done();
//! # driver.rx.done();
//! ```

use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use crate::buffer::FrameBuffer;
use crate::config::{ConfigStore, NodeContext};
use crate::consts::{
    ACK_TIMEOUT_TICKS, BROADCAST_ID, PREAMBLE_BYTE, PREAMBLE_LEN, SYNC_BYTE, TX_BUF_LEN,
};
use crate::error::LinkError;
use crate::frame::{Command, Frame, FrameType};
use crate::pll::SoftwarePll;
use crate::value::Value;

/// The handler invoked with each accepted, filtered frame.
///
/// Dispatched synchronously from [`LinkDriver::receive`] on the polling
/// context; user code never runs in the tick interrupt.
pub type FrameHandler = fn(&Frame);

/// Radio state of the driver: the medium is half-duplex, so the node is
/// either listening, keying the channel, or parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkMode {
    /// Powered but neither sampling nor transmitting.
    Idle,
    /// Sampling the input every tick and recovering bits.
    #[default]
    Rx,
    /// Keying the output one bit per bit period.
    Tx,
}

/// State of the one in-flight send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckWait {
    /// No attempt outstanding.
    None,
    /// Transmission finished (or finishing); an ACK from `peer` is awaited
    /// for `remaining` more ticks.
    Pending { peer: u8, remaining: u16 },
    /// The awaited ACK arrived.
    Acked,
    /// The wait elapsed with no ACK.
    TimedOut,
}

/// The node-side link-layer protocol engine.
///
/// Owns the radio pins, the bit-recovery sampler, the receive ring, and
/// the node identity. One instance per radio; transmission is exclusive
/// (a second send while one is in flight reports `WouldBlock`).
///
/// ## Type Parameters
///
/// - `TX`: output pin keying the transmitter
/// - `RX`: input pin sensing the receiver level
/// - `CFG`: durable store for the node identity
#[derive(Debug)]
pub struct LinkDriver<TX, RX, CFG>
where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    /// Current radio state.
    pub mode: LinkMode,
    /// TX pin.
    pub tx: TX,
    /// RX pin.
    pub rx: RX,
    /// Bit-recovery sampler and streaming frame assembler.
    pub pll: SoftwarePll,
    store: CFG,
    ctx: NodeContext,
    handler: Option<FrameHandler>,
    ticks_per_bit: u8,
    tick_counter: u8,
    tx_buf: Vec<u8, TX_BUF_LEN>,
    tx_index: u8,
    tx_bit: u8,
    ring: FrameBuffer,
    ack_wait: AckWait,

    /// Transmissions shipped in full.
    pub tx_good: u16,
    /// Frames that decoded and CRC-validated successfully.
    pub rx_good: u16,
    /// Completed assemblies that failed structural validation or CRC.
    pub rx_bad: u16,
}

impl<TX, RX, CFG> LinkDriver<TX, RX, CFG>
where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    /// Creates a driver, loading the node identity from `store`.
    ///
    /// `ticks_per_bit` is the number of `tick()` calls per bit period
    /// (e.g. 8). `rx_inverted` flips the sampled level for receivers with
    /// active-low data output. The TX pin is driven low (carrier off) and
    /// the driver starts out listening.
    pub fn new(mut tx: TX, rx: RX, mut store: CFG, ticks_per_bit: u8, rx_inverted: bool) -> Self {
        let _ = tx.set_low();
        let ctx = store.load();
        Self {
            mode: LinkMode::Rx,
            tx,
            rx,
            pll: SoftwarePll::new(ticks_per_bit, rx_inverted),
            store,
            ctx,
            handler: None,
            ticks_per_bit,
            tick_counter: 0,
            tx_buf: Vec::new(),
            tx_index: 0,
            tx_bit: 0,
            ring: FrameBuffer::new(),
            ack_wait: AckWait::None,
            tx_good: 0,
            rx_good: 0,
            rx_bad: 0,
        }
    }

    /// The node identity currently in effect.
    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// Registers the user handler invoked with each accepted frame,
    /// replacing any previous one.
    pub fn attach(&mut self, handler: FrameHandler) {
        self.handler = Some(handler);
    }

    /// Number of decoded frames waiting for [`Self::receive`].
    pub fn pending(&self) -> usize {
        self.ring.len()
    }

    /// Frames dropped because the receive ring was full when they
    /// completed.
    pub fn rx_dropped(&self) -> u16 {
        self.ring.dropped
    }

    fn write_tx(&mut self, level: bool) {
        if level {
            let _ = self.tx.set_high();
        } else {
            let _ = self.tx.set_low();
        }
    }

    /// Parks the radio: carrier off, no sampling.
    pub fn set_mode_idle(&mut self) {
        if self.mode != LinkMode::Idle {
            self.write_tx(false);
            self.mode = LinkMode::Idle;
        }
    }

    /// Puts the radio into receive mode and restarts frame acquisition.
    pub fn set_mode_rx(&mut self) {
        if self.mode != LinkMode::Rx {
            self.write_tx(false);
            self.pll.restart();
            self.mode = LinkMode::Rx;
        }
    }

    fn set_mode_tx(&mut self) {
        self.tx_index = 0;
        self.tx_bit = 0;
        self.tick_counter = 0;
        self.mode = LinkMode::Tx;
    }

    /// Starts one send attempt.
    ///
    /// The frame is sealed and queued for bit-serial transmission; for
    /// frame types that request acknowledgment
    /// ([`FrameType::StateAck`] and [`FrameType::Cmd`]) a timed ACK wait is
    /// armed that begins once the last bit has been keyed.
    ///
    /// # Errors
    /// - `WouldBlock` while a previous transmission or ACK wait is still
    ///   in flight (single in-flight transmission on the half-duplex
    ///   channel).
    /// - [`LinkError::NotLinked`] when the node is unlinked and `frame` is
    ///   not itself a link request.
    ///
    /// The attempt resolves through [`Self::poll_send`]; this call performs
    /// exactly one timed attempt, retry policy belongs to the caller.
    pub fn send(&mut self, frame: &Frame) -> nb::Result<(), LinkError> {
        if !self.ctx.linked && !frame.is_link_request() {
            return Err(nb::Error::Other(LinkError::NotLinked));
        }
        if self.mode == LinkMode::Tx || matches!(self.ack_wait, AckWait::Pending { .. }) {
            return Err(nb::Error::WouldBlock);
        }

        let mut sealed = *frame;
        sealed.seal();
        self.load_tx(&sealed);

        self.ack_wait = if sealed.frame_type.wants_ack() {
            AckWait::Pending {
                peer: sealed.receptor,
                remaining: ACK_TIMEOUT_TICKS,
            }
        } else {
            AckWait::None
        };
        Ok(())
    }

    /// Resolves the in-flight send attempt.
    ///
    /// Returns `WouldBlock` while bits are still going out or the ACK wait
    /// is running; `Ok` once the frame is shipped (and acknowledged, if an
    /// ACK was requested); [`LinkError::AckTimeout`] if the wait elapsed.
    /// Either way the engine is immediately ready for the next send.
    pub fn poll_send(&mut self) -> nb::Result<(), LinkError> {
        if self.mode == LinkMode::Tx {
            return Err(nb::Error::WouldBlock);
        }
        match self.ack_wait {
            AckWait::None => Ok(()),
            AckWait::Pending { .. } => Err(nb::Error::WouldBlock),
            AckWait::Acked => {
                self.ack_wait = AckWait::None;
                Ok(())
            }
            AckWait::TimedOut => {
                self.ack_wait = AckWait::None;
                Err(nb::Error::Other(LinkError::AckTimeout))
            }
        }
    }

    /// Advances the transmit/receive machinery by one timing tick.
    ///
    /// Must be called at a fixed interval, `ticks_per_bit` times per bit
    /// period — from a timer interrupt or a delay loop. Runs to completion
    /// in constant time.
    pub fn tick(&mut self) {
        match self.mode {
            LinkMode::Rx => {
                self.pll.update(&mut self.rx);
                if self.pll.frame_ready() {
                    match Frame::decode(self.pll.frame_bytes()) {
                        Ok(frame) => {
                            self.rx_good += 1;
                            self.accept(frame);
                        }
                        // Corrupt frame on a lossy channel: drop, count,
                        // resynchronize.
                        Err(_) => self.rx_bad += 1,
                    }
                    self.pll.restart();
                }
                self.tick_ack_wait();
            }
            LinkMode::Tx => {
                self.tick_counter += 1;
                if self.tick_counter >= self.ticks_per_bit {
                    self.tick_counter = 0;
                    self.transmit_bit();
                }
            }
            LinkMode::Idle => self.tick_ack_wait(),
        }
    }

    fn tick_ack_wait(&mut self) {
        if let AckWait::Pending { remaining, .. } = &mut self.ack_wait {
            *remaining -= 1;
            if *remaining == 0 {
                self.ack_wait = AckWait::TimedOut;
            }
        }
    }

    /// Routes a validated frame: either it resolves the pending ACK wait,
    /// or it is queued for the polling context. Runs in the tick context.
    fn accept(&mut self, frame: Frame) {
        if let AckWait::Pending { peer, .. } = self.ack_wait {
            if frame.frame_type == FrameType::Ack
                && frame.sender == peer
                && frame.receptor == self.ctx.node_id
            {
                self.ack_wait = AckWait::Acked;
                return;
            }
        }
        self.ring.push(frame);
    }

    /// Keys the next bit of the transmit image, MSB-first.
    ///
    /// Called once per bit period by `tick()`. The carrier is dropped one
    /// bit period after the last data bit.
    fn transmit_bit(&mut self) {
        if self.tx_index as usize >= self.tx_buf.len() {
            self.tx_good += 1;
            self.set_mode_rx();
        } else {
            let bit = self.tx_buf[self.tx_index as usize] & (0x80 >> self.tx_bit);
            self.tx_bit += 1;
            self.write_tx(bit != 0);
            if self.tx_bit >= 8 {
                self.tx_bit = 0;
                self.tx_index += 1;
            }
        }
    }

    fn load_tx(&mut self, frame: &Frame) {
        self.tx_buf.clear();
        for _ in 0..PREAMBLE_LEN {
            let _ = self.tx_buf.push(PREAMBLE_BYTE);
        }
        let _ = self.tx_buf.push(SYNC_BYTE);
        // Cannot fail: TX_BUF_LEN covers the largest frame.
        let _ = frame.encode(&mut self.tx_buf);
        self.set_mode_tx();
    }

    /// Dequeues, filters, and dispatches the oldest received frame.
    ///
    /// Non-blocking. Returns the frame that was delivered to the handler,
    /// or `None` when nothing was waiting or the oldest frame was filtered
    /// out (foreign receptor, or a non-LINK frame while unlinked —
    /// silently ignored, per the lossy-medium contract).
    ///
    /// For frames that request acknowledgment an ACK is keyed back to the
    /// sender before dispatch. LINK and RESET commands update the node
    /// identity and persist it through the configuration store.
    pub fn receive(&mut self) -> Option<Frame> {
        let frame = self.receive_frame()?;
        if let Some(handler) = self.handler {
            handler(&frame);
        }
        Some(frame)
    }

    /// Like [`Self::receive`], but returns the accepted frame without
    /// invoking the handler. Used by the `timer-isr` helpers to keep the
    /// user callback outside the critical section.
    pub fn receive_frame(&mut self) -> Option<Frame> {
        let frame = self.ring.pop()?;
        if frame.receptor != self.ctx.node_id && frame.receptor != BROADCAST_ID {
            return None;
        }
        let cmd = frame.command();
        if !self.ctx.linked && cmd != Some(Command::Link) {
            #[cfg(feature = "log")]
            log::debug!("ignoring frame from {}: not linked", frame.sender);
            return None;
        }

        // LINK adopts the new identity before the ACK goes out, so the ACK
        // already carries the assigned node id; RESET clears it after, so
        // the ACK still carries the old one.
        if cmd == Some(Command::Link) {
            self.handle_link(&frame);
        }
        if frame.frame_type.wants_ack() {
            self.send_ack(frame.sender);
        }
        if cmd == Some(Command::Reset) {
            self.handle_reset();
        }
        Some(frame)
    }

    fn send_ack(&mut self, to: u8) {
        // Half-duplex: if the channel is already being keyed, skip the ACK
        // and let the peer's retry pick it up later.
        if self.mode == LinkMode::Tx {
            return;
        }
        let mut ack = Frame::new(to, self.ctx.node_id, FrameType::Ack);
        ack.seal();
        self.load_tx(&ack);
    }

    fn handle_link(&mut self, frame: &Frame) {
        self.ctx.master_id = frame.sender;
        if let Some(Ok(Value::U8(id))) = frame.values().next() {
            self.ctx.node_id = id;
        }
        self.ctx.linked = true;
        self.store.save(&self.ctx);
        #[cfg(feature = "log")]
        log::info!(
            "linked to master {} as node {}",
            self.ctx.master_id,
            self.ctx.node_id
        );
    }

    fn handle_reset(&mut self) {
        self.ctx = NodeContext::default();
        self.store.save(&self.ctx);
        #[cfg(feature = "log")]
        log::info!("node identity reset");
    }
}
