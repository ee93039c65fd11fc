//! Hardware watchdog abstraction
//!
//! If [`Watchdog::feed`] is not called within [`Watchdog::window_ms`], the
//! device resets. The loop feeds once per completed iteration, so a hang in
//! sampling, inference or publishing is caught alike.

use crate::errors::WatchdogError;

/// Liveness timer that resets the device when starved
pub trait Watchdog {
    /// Restart the countdown
    fn feed(&mut self) -> Result<(), WatchdogError>;

    /// Maximum time between feeds before reset (milliseconds)
    fn window_ms(&self) -> u32;

    /// Whether the device resets after [`window_ms`](Self::window_ms)
    ///
    /// False when the backend runs on a timeout of its own and the window is
    /// only nominal.
    fn enforces_window(&self) -> bool {
        true
    }
}

#[cfg(feature = "std")]
impl<W: Watchdog + ?Sized> Watchdog for std::boxed::Box<W> {
    fn feed(&mut self) -> Result<(), WatchdogError> {
        (**self).feed()
    }

    fn window_ms(&self) -> u32 {
        (**self).window_ms()
    }

    fn enforces_window(&self) -> bool {
        (**self).enforces_window()
    }
}
