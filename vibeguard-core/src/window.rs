//! Fixed-Length Window Buffer for Inference Frames
//!
//! ## Overview
//!
//! The classifier consumes whole windows of `N` samples. This module
//! accumulates samples one tick at a time and hands out a [`Frame`] exactly
//! when the `N`-th sample lands, resetting the write index in the same call.
//!
//! ## Design Rationale
//!
//! ### Why not the ring buffer?
//!
//! A sliding ring buffer would let the classifier see overlapping windows.
//! The model was trained on disjoint windows, so the buffer is linear: it
//! fills from slot 0, completes, and starts over from slot 0.
//!
//! ### No Torn Frames
//!
//! [`WindowBuffer::append`] returns a [`Frame`] that borrows the buffer. While
//! the frame is alive the borrow checker forbids another `append`, so a frame
//! can never be observed half overwritten. The next append after the frame is
//! dropped starts a new window at slot 0.
//!
//! ### Memory Layout
//!
//! Samples are stored as interleaved triples, the layout the model reads:
//!
//! ```text
//! WindowBuffer<4>:
//! ┌────────────┬────────────┬────────────┬────────────┐
//! │ x0 y0 z0   │ x1 y1 z1   │ x2 y2 z2   │ x3 y3 z3   │
//! └────────────┴────────────┴────────────┴────────────┘
//!                    ↑
//!                    └── write_pos = 1 (one sample pending)
//!
//! Total size = 12 * N + 8 bytes
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use vibeguard_core::{Sample, window::WindowBuffer};
//!
//! let mut window: WindowBuffer<2> = WindowBuffer::new();
//!
//! assert!(window.append(Sample::new(0.0, 0.0, 1.0)).is_none());
//! let frame = window.append(Sample::new(0.1, 0.0, 1.0)).unwrap();
//! assert_eq!(frame.as_interleaved(), &[0.0, 0.0, 1.0, 0.1, 0.0, 1.0]);
//! ```

use crate::constants::AXES;
use crate::sample::{Axis, Sample};

/// Linear accumulator for one inference frame of `N` samples
///
/// ## Internal Invariants
///
/// - `write_pos < N` between calls
/// - `write_pos` is 0 immediately after a frame is returned
/// - slots `[0, write_pos)` hold samples of the frame in progress
#[derive(Clone)]
pub struct WindowBuffer<const N: usize> {
    slots: [[f32; AXES]; N],
    write_pos: usize,
    frames_completed: u64,
}

impl<const N: usize> WindowBuffer<N> {
    const NON_EMPTY: () = assert!(N > 0, "frame length must be at least one sample");

    /// Creates an empty buffer
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            slots: [[0.0; AXES]; N],
            write_pos: 0,
            frames_completed: 0,
        }
    }

    /// Writes `sample` into the next free slot
    ///
    /// Returns the completed frame when this sample was the `N`-th since the
    /// last reset; the write index is back at zero by the time the caller
    /// sees the frame.
    pub fn append(&mut self, sample: Sample) -> Option<Frame<'_, N>> {
        self.slots[self.write_pos] = sample.to_array();
        self.write_pos += 1;

        if self.write_pos < N {
            return None;
        }

        self.write_pos = 0;
        self.frames_completed += 1;
        Some(Frame { slots: &self.slots })
    }

    /// Samples written towards the frame in progress
    pub fn len(&self) -> usize {
        self.write_pos
    }

    /// True when no sample of the next frame has been written
    pub fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// Samples per frame
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Frames handed out since creation
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Discards the frame in progress
    pub fn reset(&mut self) {
        self.write_pos = 0;
    }
}

impl<const N: usize> Default for WindowBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete window of `N` samples, borrowed from the buffer
#[derive(Clone, Copy)]
pub struct Frame<'a, const N: usize> {
    slots: &'a [[f32; AXES]; N],
}

impl<'a, const N: usize> Frame<'a, N> {
    /// Values as `[x0, y0, z0, x1, y1, z1, ...]`, `N * 3` long
    pub fn as_interleaved(&self) -> &'a [f32] {
        let slots: &'a [[f32; AXES]; N] = self.slots;
        slots.as_flattened()
    }

    /// Samples per frame
    pub const fn len(&self) -> usize {
        N
    }

    /// Never true; frames are only produced when full
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Sample at `index`, oldest first
    pub fn sample(&self, index: usize) -> Option<Sample> {
        self.slots.get(index).map(|triple| Sample::from_array(*triple))
    }

    /// Samples oldest to newest
    pub fn samples(&self) -> impl Iterator<Item = Sample> + 'a {
        let slots: &'a [[f32; AXES]; N] = self.slots;
        slots.iter().map(|triple| Sample::from_array(*triple))
    }

    /// Values of one axis oldest to newest
    pub fn axis(&self, axis: Axis) -> impl Iterator<Item = f32> + 'a {
        let slots: &'a [[f32; AXES]; N] = self.slots;
        slots.iter().map(move |triple| triple[axis.offset()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Sample {
        Sample::new(i as f32, i as f32 + 0.25, i as f32 + 0.5)
    }

    #[test]
    fn empty_buffer() {
        let buffer: WindowBuffer<5> = WindowBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.capacity(), 5);
        assert_eq!(buffer.frames_completed(), 0);
    }

    #[test]
    fn frame_only_on_nth_sample() {
        let mut buffer = WindowBuffer::<3>::new();

        assert!(buffer.append(sample(0)).is_none());
        assert!(buffer.append(sample(1)).is_none());
        assert_eq!(buffer.len(), 2);

        let frame = buffer.append(sample(2)).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.sample(0), Some(sample(0)));
        assert_eq!(frame.sample(2), Some(sample(2)));
        assert_eq!(frame.sample(3), None);

        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.frames_completed(), 1);
    }

    #[test]
    fn interleaved_layout() {
        let mut buffer = WindowBuffer::<2>::new();
        buffer.append(Sample::new(1.0, 2.0, 3.0));
        let frame = buffer.append(Sample::new(4.0, 5.0, 6.0)).unwrap();

        assert_eq!(frame.as_interleaved(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y: Vec<f32> = frame.axis(Axis::Y).collect();
        assert_eq!(y, vec![2.0, 5.0]);
    }

    #[test]
    fn next_frame_starts_at_slot_zero() {
        let mut buffer = WindowBuffer::<2>::new();
        for i in 0..2 {
            buffer.append(sample(i));
        }

        assert!(buffer.append(sample(10)).is_none());
        let frame = buffer.append(sample(11)).unwrap();
        let samples: Vec<Sample> = frame.samples().collect();
        assert_eq!(samples, vec![sample(10), sample(11)]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut buffer = WindowBuffer::<3>::new();
        buffer.append(sample(0));
        buffer.append(sample(1));
        buffer.reset();

        assert!(buffer.is_empty());
        assert!(buffer.append(sample(2)).is_none());
        assert!(buffer.append(sample(3)).is_none());
        let frame = buffer.append(sample(4)).unwrap();
        assert_eq!(frame.sample(0), Some(sample(2)));
    }

    #[test]
    fn single_sample_frames() {
        let mut buffer = WindowBuffer::<1>::new();
        for i in 0..4 {
            let frame = buffer.append(sample(i)).unwrap();
            assert_eq!(frame.sample(0), Some(sample(i)));
        }
        assert_eq!(buffer.frames_completed(), 4);
    }
}
