/// Declares a static global `LINK_DRIVER` instance protected by a
/// `critical_section` mutex.
///
/// Creates a `static` singleton suitable for interrupt-based environments,
/// where both the main thread and a timer ISR need safe access to the
/// shared driver state.
///
/// # Arguments
/// - `$tx`: the concrete type of the TX pin (must implement `OutputPin`)
/// - `$rx`: the concrete type of the RX pin (must implement `InputPin`)
/// - `$cfg`: the concrete configuration store type (must implement
///   `ConfigStore`)
///
/// # Example
/// ```rust,ignore
/// init_link_driver!(MyTxPinType, MyRxPinType, VolatileStore);
/// ```
#[macro_export]
macro_rules! init_link_driver {
    ( $tx:ty, $rx:ty, $cfg:ty ) => {
        pub static LINK_DRIVER: $crate::critical_section::Mutex<
            core::cell::RefCell<Option<$crate::driver::LinkDriver<$tx, $rx, $cfg>>>,
        > = $crate::critical_section::Mutex::new(core::cell::RefCell::new(None));
    };
}

/// Initializes the global `LINK_DRIVER` singleton with a new driver.
///
/// Wraps construction of the `LinkDriver` and stores it inside the global
/// declared by [`init_link_driver!`].
///
/// # Arguments
/// - `$tx`: the TX pin value
/// - `$rx`: the RX pin value
/// - `$cfg`: the configuration store value
/// - `$tpb`: ticks per bit (e.g., 8 for 2 kbps with a 62.5 µs tick)
/// - `$rx_inverted`: whether the RX pin level is inverted
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     setup_link_driver!(tx, rx, store, 8, false);
/// }
/// ```
///
/// # Notes
/// - Safe to call from `main()` before interrupts are enabled.
/// - Requires `init_link_driver!` to have been used earlier.
#[macro_export]
macro_rules! setup_link_driver {
    ( $tx:expr, $rx:expr, $cfg:expr, $tpb:expr, $rx_inverted:expr ) => {
        $crate::critical_section::with(|cs| {
            LINK_DRIVER
                .borrow(cs)
                .replace(Some($crate::driver::LinkDriver::new(
                    $tx,
                    $rx,
                    $cfg,
                    $tpb,
                    $rx_inverted,
                )));
        });
    };
}

/// Calls `tick()` on the global `LINK_DRIVER` if it has been initialized.
///
/// Invoke from a timer ISR to advance the link state machine at the tick
/// rate (e.g., every 62.5 µs for 8 ticks per bit at 2 kbps).
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     tick_link_timer!();
/// }
/// ```
///
/// # Notes
/// - Silently does nothing if the driver has not been set up yet.
#[macro_export]
macro_rules! tick_link_timer {
    () => {
        $crate::critical_section::with(|cs| {
            if let Some(driver) = LINK_DRIVER.borrow(cs).borrow_mut().as_mut() {
                driver.tick();
            }
        });
    };
}
