use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::ConfigStore;
use crate::driver::LinkDriver;
use crate::error::LinkError;
use crate::frame::Frame;

/// Runs a blocking loop that repeatedly calls `tick()` on the link driver.
///
/// A simple timing loop for environments where interrupts are unavailable
/// or undesired. The driver's timing is derived from a HAL delay provider
/// implementing `embedded_hal::delay::DelayNs`.
///
/// # Arguments
/// - `driver`: the link driver to clock
/// - `delay`: a HAL delay provider
/// - `tick_us`: the interval between tick calls, in microseconds
///   (e.g. 63 for ~2 kbps at 8 ticks per bit)
///
/// # Notes
/// - This loop never returns; it is intended for single-purpose polling
///   firmware. Handle frames from the driver's attached callback.
/// - For concurrent applications, prefer interrupt-driven tick scheduling
///   (feature `timer-isr`).
pub fn run_link_tick_loop<D, TX, RX, CFG>(
    driver: &mut LinkDriver<TX, RX, CFG>,
    delay: &mut D,
    tick_us: u32,
) where
    D: DelayNs,
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    loop {
        driver.tick();
        let _ = driver.receive();
        delay.delay_us(tick_us);
    }
}

/// Performs one complete send attempt, clocking the driver in-line.
///
/// Queues `frame`, then keeps ticking at `tick_us` intervals until the
/// attempt resolves: the frame is shipped (and acknowledged, if its type
/// requests acknowledgment) or the ACK wait times out. One attempt only;
/// callers decide whether a timeout warrants a retry.
///
/// # Errors
/// - [`LinkError::NotLinked`] when the node is unlinked and `frame` is not
///   a link request
/// - [`LinkError::AckTimeout`] when no matching ACK arrived in time
pub fn send_blocking<D, TX, RX, CFG>(
    driver: &mut LinkDriver<TX, RX, CFG>,
    delay: &mut D,
    tick_us: u32,
    frame: &Frame,
) -> Result<(), LinkError>
where
    D: DelayNs,
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    loop {
        match driver.send(frame) {
            Ok(()) => break,
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => return Err(e),
        }
        driver.tick();
        delay.delay_us(tick_us);
    }
    loop {
        match driver.poll_send() {
            Ok(()) => return Ok(()),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => return Err(e),
        }
        driver.tick();
        delay.delay_us(tick_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodeContext, VolatileStore};
    use crate::frame::FrameType;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn test_send_blocking_resolves_with_timeout() {
        use crate::consts::{ACK_TIMEOUT_TICKS, PREAMBLE_BYTE, PREAMBLE_LEN, SYNC_BYTE, TX_BUF_LEN};

        let frame = Frame::new(1, 2, FrameType::StateAck);
        let mut sealed = frame;
        sealed.seal();
        let mut image = std::vec![PREAMBLE_BYTE; PREAMBLE_LEN];
        image.push(SYNC_BYTE);
        let mut wire: heapless::Vec<u8, TX_BUF_LEN> = heapless::Vec::new();
        sealed.encode(&mut wire).unwrap();
        image.extend_from_slice(&wire);

        // one set from construction, one per bit, one dropping the carrier
        let mut tx_states = std::vec![PinTransaction::set(PinState::Low)];
        for byte in &image {
            for bit in 0..8 {
                tx_states.push(PinTransaction::set(if byte & (0x80 >> bit) != 0 {
                    PinState::High
                } else {
                    PinState::Low
                }));
            }
        }
        tx_states.push(PinTransaction::set(PinState::Low));
        let rx_states: std::vec::Vec<PinTransaction> = (0..ACK_TIMEOUT_TICKS)
            .map(|_| PinTransaction::get(PinState::Low))
            .collect();

        let tx = PinMock::new(&tx_states);
        let rx = PinMock::new(&rx_states);
        let store = VolatileStore::new(NodeContext {
            master_id: 0,
            node_id: 2,
            linked: true,
        });
        let mut driver = LinkDriver::new(tx, rx, store, 1, false);
        let mut delay = NoopDelay::new();

        assert_eq!(
            send_blocking(&mut driver, &mut delay, 500, &frame),
            Err(LinkError::AckTimeout)
        );
        driver.tx.done();
        driver.rx.done();
    }
}
