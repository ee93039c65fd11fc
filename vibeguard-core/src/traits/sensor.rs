//! Sample source abstraction
//!
//! Register-level sensor access stays in the driver. The loop asks for one
//! reading per scheduler tick and accepts three outcomes:
//!
//! - `Ok(sample)`: a calibrated reading in g
//! - `Err(nb::Error::WouldBlock)`: no fresh conversion yet, skip this tick
//! - `Err(nb::Error::Other(e))`: transfer failed, skip this tick
//!
//! Either error leaves the window buffer untouched.

use crate::errors::SensorError;
use crate::sample::Sample;

/// Produces one calibrated 3-axis reading on demand
///
/// Implementations must return values already scaled to g; the loop never
/// rescales. Use [`Sample::from_raw`] when the driver only has register counts.
pub trait SampleSource {
    /// Read one sample
    fn read(&mut self) -> nb::Result<Sample, SensorError>;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn read(&mut self) -> nb::Result<Sample, SensorError> {
        (**self).read()
    }
}
