//! Sampling Constants
//!
//! Acquisition geometry expected by the anomaly model. The model was trained
//! on one-second windows of three-axis acceleration sampled at 100 Hz, so the
//! scheduler rate and the frame length must stay in step with it.

// ===== ACQUISITION =====

/// Sampling frequency expected by the classifier (Hz).
///
/// The scheduler derives its tick period from this value.
pub const SAMPLE_RATE_HZ: u32 = 100;

/// Number of samples per axis in one inference frame.
///
/// At 100 Hz this is a one second window.
pub const FRAME_LEN: usize = 100;

/// Number of acceleration axes per sample (X, Y, Z).
pub const AXES: usize = 3;

/// Number of interleaved values handed to the classifier per frame.
///
/// Layout: `[x0, y0, z0, x1, y1, z1, ...]`
pub const FRAME_VALUES: usize = FRAME_LEN * AXES;

// ===== SCALING =====

/// Accelerometer sensitivity at the ±2 g full-scale range (LSB per g).
///
/// Raw 16-bit register counts are divided by this value exactly once, when a
/// sample is built from raw counts. Nothing downstream rescales.
///
/// Source: MPU-6050 register map, ACCEL_CONFIG AFS_SEL = 0
pub const ACCEL_LSB_PER_G: f32 = 16384.0;

/// Highest sampling rate with a non-zero tick period (Hz).
///
/// The scheduler counts in whole microseconds; above 1 MHz the period
/// truncates to zero.
pub const MAX_SAMPLE_RATE_HZ: u32 = 1_000_000;

/// Tick period in microseconds for a given sampling rate.
///
/// Returns `None` for a zero rate or a rate above [`MAX_SAMPLE_RATE_HZ`].
pub const fn tick_period_us(rate_hz: u32) -> Option<u64> {
    if rate_hz == 0 || rate_hz > MAX_SAMPLE_RATE_HZ {
        None
    } else {
        Some(1_000_000 / rate_hz as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_values_are_interleaved_triples() {
        assert_eq!(FRAME_VALUES % AXES, 0);
        assert_eq!(FRAME_VALUES / AXES, FRAME_LEN);
    }

    #[test]
    fn tick_period() {
        assert_eq!(tick_period_us(SAMPLE_RATE_HZ), Some(10_000));
        assert_eq!(tick_period_us(0), None);
        assert_eq!(tick_period_us(MAX_SAMPLE_RATE_HZ), Some(1));
        assert_eq!(tick_period_us(MAX_SAMPLE_RATE_HZ + 1), None);
        assert_eq!(tick_period_us(u32::MAX), None);
    }
}
