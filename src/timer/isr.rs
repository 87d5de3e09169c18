use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::ConfigStore;
use crate::driver::{FrameHandler, LinkDriver};
use crate::error::LinkError;
use crate::frame::Frame;

/// The shared-driver cell type used by all `timer-isr` helpers.
///
/// Both the timer interrupt and the mainline go through the same
/// `critical_section::Mutex`, so every access to the driver is serialized.
pub type GlobalLinkDriver<TX, RX, CFG> = Mutex<RefCell<Option<LinkDriver<TX, RX, CFG>>>>;

/// Initializes the global static [`LinkDriver`] cell, empty.
///
/// # Example
/// ```rust,ignore
/// use nestlink::config::VolatileStore;
/// use nestlink::timer::{global_link_driver_init, GlobalLinkDriver};
/// use some_hal::{PD1, PD2};
///
/// static LINK_DRIVER: GlobalLinkDriver<PD1, PD2, VolatileStore> =
///     global_link_driver_init::<PD1, PD2, VolatileStore>();
/// ```
pub const fn global_link_driver_init<TX, RX, CFG>() -> GlobalLinkDriver<TX, RX, CFG>
where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    Mutex::new(RefCell::new(None))
}

/// Places a freshly constructed driver into the global cell.
///
/// # Arguments
/// * The global static driver cell
/// * The tx pin, rx pin, and configuration store
/// * The number of ticks per bit, such that
///   `interrupt frequency / ticks per bit = 2000 bits per second`
///   (e.g. 8 for a 62.5 µs timer interrupt)
/// * Whether the rx pin level is inverted
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     global_link_driver_setup(&LINK_DRIVER, tx, rx, store, 8, false);
/// }
/// ```
pub fn global_link_driver_setup<TX, RX, CFG>(
    global_driver: &'static GlobalLinkDriver<TX, RX, CFG>,
    tx: TX,
    rx: RX,
    store: CFG,
    ticks_per_bit: u8,
    rx_inverted: bool,
) where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    critical_section::with(|cs| {
        let _ = global_driver.borrow(cs).replace(Some(LinkDriver::new(
            tx,
            rx,
            store,
            ticks_per_bit,
            rx_inverted,
        )));
    });
}

/// Runs the driver tick. Call from the timer interrupt.
///
/// Does nothing if the driver has not been set up yet.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     global_link_timer_tick(&LINK_DRIVER);
/// }
/// ```
pub fn global_link_timer_tick<TX, RX, CFG>(global_driver: &'static GlobalLinkDriver<TX, RX, CFG>)
where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    critical_section::with(|cs| {
        if let Some(driver) = global_driver.borrow(cs).borrow_mut().as_mut() {
            driver.tick();
        }
    });
}

/// Performs one complete send attempt against the global driver.
///
/// Spins on short critical sections, so the timer interrupt keeps clocking
/// the driver between polls. Blocks the mainline until the attempt
/// resolves: shipped (and acknowledged, where the frame type requests it)
/// or timed out. One attempt only; retry policy stays with the caller.
///
/// # Errors
/// - [`LinkError::NotLinked`] when the node is unlinked and `frame` is not
///   a link request, or the driver has not been set up
/// - [`LinkError::AckTimeout`] when no matching ACK arrived in time
pub fn global_link_send<TX, RX, CFG>(
    global_driver: &'static GlobalLinkDriver<TX, RX, CFG>,
    frame: &Frame,
) -> Result<(), LinkError>
where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    loop {
        let queued = critical_section::with(|cs| {
            match global_driver.borrow(cs).borrow_mut().as_mut() {
                Some(driver) => match driver.send(frame) {
                    Ok(()) => Some(Ok(())),
                    Err(nb::Error::WouldBlock) => None,
                    Err(nb::Error::Other(e)) => Some(Err(e)),
                },
                None => Some(Err(LinkError::NotLinked)),
            }
        });
        match queued {
            Some(Ok(())) => break,
            Some(Err(e)) => return Err(e),
            None => {} // channel busy; the tick interrupt will drain it
        }
    }
    loop {
        let resolved = critical_section::with(|cs| {
            match global_driver.borrow(cs).borrow_mut().as_mut() {
                Some(driver) => match driver.poll_send() {
                    Ok(()) => Some(Ok(())),
                    Err(nb::Error::WouldBlock) => None,
                    Err(nb::Error::Other(e)) => Some(Err(e)),
                },
                None => Some(Err(LinkError::NotLinked)),
            }
        });
        if let Some(result) = resolved {
            return result;
        }
    }
}

/// Dequeues the oldest accepted frame from the global driver and hands it
/// to `handler`.
///
/// The ring is drained inside a critical section, but `handler` runs
/// outside it, so user code never executes with interrupts masked.
/// Returns the delivered frame, or `None` when nothing was waiting (or the
/// oldest frame was filtered out).
pub fn global_link_receive<TX, RX, CFG>(
    global_driver: &'static GlobalLinkDriver<TX, RX, CFG>,
    handler: FrameHandler,
) -> Option<Frame>
where
    TX: OutputPin,
    RX: InputPin,
    CFG: ConfigStore,
{
    let frame = critical_section::with(|cs| {
        global_driver
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .and_then(|driver| driver.receive_frame())
    })?;
    handler(&frame);
    Some(frame)
}
