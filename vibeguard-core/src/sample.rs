//! Three-axis acceleration samples
//!
//! A [`Sample`] is produced once per scheduler tick and consumed immediately
//! into the window buffer. Values are in units of standard gravity (g).

use crate::constants::{ACCEL_LSB_PER_G, AXES};

/// Acceleration axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Axis {
    /// Sensor X axis
    X = 0,
    /// Sensor Y axis
    Y = 1,
    /// Sensor Z axis
    Z = 2,
}

impl Axis {
    /// All axes in interleaving order
    pub const ALL: [Axis; AXES] = [Axis::X, Axis::Y, Axis::Z];

    /// Offset of this axis inside an interleaved triple
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// One calibrated 3-axis reading in g
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// X acceleration (g)
    pub x: f32,
    /// Y acceleration (g)
    pub y: f32,
    /// Z acceleration (g)
    pub z: f32,
}

impl Sample {
    /// Sample from values already in g
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Sample from raw signed 16-bit accelerometer counts
    ///
    /// This is the only place raw counts are converted to g.
    ///
    /// ```rust
    /// use vibeguard_core::Sample;
    ///
    /// let s = Sample::from_raw(16384, -8192, 0);
    /// assert_eq!(s, Sample::new(1.0, -0.5, 0.0));
    /// ```
    pub fn from_raw(x: i16, y: i16, z: i16) -> Self {
        Self {
            x: x as f32 / ACCEL_LSB_PER_G,
            y: y as f32 / ACCEL_LSB_PER_G,
            z: z as f32 / ACCEL_LSB_PER_G,
        }
    }

    /// Value on one axis
    pub const fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Values in interleaving order
    pub const fn to_array(self) -> [f32; AXES] {
        [self.x, self.y, self.z]
    }

    /// Build from an interleaved triple
    pub const fn from_array(values: [f32; AXES]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// False if any axis is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_full_scale_is_two_g() {
        let s = Sample::from_raw(i16::MAX, i16::MIN, 0);
        assert!((s.x - 2.0).abs() < 1e-3);
        assert_eq!(s.y, -2.0);
        assert_eq!(s.z, 0.0);
    }

    #[test]
    fn axis_access_matches_layout() {
        let s = Sample::new(0.1, 0.2, 0.3);
        for axis in Axis::ALL {
            assert_eq!(s.get(axis), s.to_array()[axis.offset()]);
        }
    }

    #[test]
    fn non_finite_detected() {
        assert!(Sample::new(0.0, 0.0, 1.0).is_finite());
        assert!(!Sample::new(f32::NAN, 0.0, 1.0).is_finite());
        assert!(!Sample::new(0.0, f32::INFINITY, 1.0).is_finite());
    }
}
