//! Fixed-channel interleaved sample storage.
//!
//! [`AudioBuffer`] is generic over its storage: the default owns a `Vec<f32>`,
//! while [`AudioBufferView`] / [`AudioBufferViewMut`] borrow memory handed in
//! by the device backend. Views have no `alloc`/`free`, so they can never
//! release memory they don't own.

use crate::Frame;
use std::ops::{Index, IndexMut, Range};

/// Per-destination-channel gain pair used when mixing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pan {
    pub left: f32,
    pub right: f32,
}

impl Pan {
    pub const CENTER: Pan = Pan {
        left: 1.0,
        right: 1.0,
    };

    /// Pan law for a knob position in `[0, 1]`, 0.5 being center.
    /// The side being panned towards stays at unity.
    pub fn from_position(position: f32) -> Self {
        let p = position.clamp(0.0, 1.0);
        if p <= 0.5 {
            Pan {
                left: 1.0,
                right: p * 2.0,
            }
        } else {
            Pan {
                left: (1.0 - p) * 2.0,
                right: 1.0,
            }
        }
    }

    /// Gain for destination channel `channel`. Channels past the stereo pair
    /// are not panned.
    #[inline]
    pub fn gain(&self, channel: usize) -> f32 {
        match channel {
            0 => self.left,
            1 => self.right,
            _ => 1.0,
        }
    }
}

impl Default for Pan {
    fn default() -> Self {
        Self::CENTER
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer<S = Vec<f32>> {
    data: S,
    frames: Frame,
    channels: usize,
}

/// Read-only view over external interleaved memory.
pub type AudioBufferView<'a> = AudioBuffer<&'a [f32]>;

/// Writable view over external interleaved memory.
pub type AudioBufferViewMut<'a> = AudioBuffer<&'a mut [f32]>;

impl AudioBuffer {
    /// Empty, unallocated buffer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            frames: 0,
            channels: 0,
        }
    }

    pub fn with_size(frames: Frame, channels: usize) -> Self {
        let mut buffer = Self::new();
        buffer.alloc(frames, channels);
        buffer
    }

    /// Takes ownership of interleaved samples. Trailing samples that don't
    /// fill a whole frame are dropped.
    pub fn from_interleaved(mut data: Vec<f32>, channels: usize) -> Self {
        if channels == 0 {
            return Self::new();
        }
        let frames = data.len() / channels;
        data.truncate(frames * channels);
        Self {
            data,
            frames,
            channels,
        }
    }

    /// Allocates zeroed storage, replacing any previous contents.
    pub fn alloc(&mut self, frames: Frame, channels: usize) {
        self.data = vec![0.0; frames * channels];
        self.frames = frames;
        self.channels = channels;
    }

    pub fn free(&mut self) {
        self.data = Vec::new();
        self.frames = 0;
        self.channels = 0;
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn as_view(&self) -> AudioBufferView<'_> {
        AudioBuffer {
            data: &self.data[..],
            frames: self.frames,
            channels: self.channels,
        }
    }

    pub fn as_view_mut(&mut self) -> AudioBufferViewMut<'_> {
        AudioBuffer {
            data: &mut self.data[..],
            frames: self.frames,
            channels: self.channels,
        }
    }
}

impl<'a> AudioBuffer<&'a [f32]> {
    /// Wraps `frames * channels` interleaved samples. A shorter slice is
    /// truncated to the whole frames it holds.
    pub fn view(data: &'a [f32], frames: Frame, channels: usize) -> Self {
        debug_assert!(data.len() >= frames * channels, "view exceeds memory");
        let frames = if channels == 0 {
            0
        } else {
            frames.min(data.len() / channels)
        };
        Self {
            data,
            frames,
            channels,
        }
    }
}

impl<'a> AudioBuffer<&'a mut [f32]> {
    pub fn view_mut(data: &'a mut [f32], frames: Frame, channels: usize) -> Self {
        debug_assert!(data.len() >= frames * channels, "view exceeds memory");
        let frames = if channels == 0 {
            0
        } else {
            frames.min(data.len() / channels)
        };
        Self {
            data,
            frames,
            channels,
        }
    }
}

impl<S: AsRef<[f32]>> AudioBuffer<S> {
    #[inline]
    pub fn frames(&self) -> Frame {
        self.frames
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.data.as_ref()[..self.frames * self.channels]
    }

    /// The interleaved channels of frame `frame`.
    #[inline]
    pub fn frame(&self, frame: Frame) -> &[f32] {
        let start = frame * self.channels;
        &self.samples()[start..start + self.channels]
    }

    #[inline]
    pub fn sample(&self, frame: Frame, channel: usize) -> f32 {
        self.samples()[frame * self.channels + channel]
    }

    /// Highest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples().iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}

impl<S: AsRef<[f32]> + AsMut<[f32]>> AudioBuffer<S> {
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        let len = self.frames * self.channels;
        &mut self.data.as_mut()[..len]
    }

    #[inline]
    pub fn frame_mut(&mut self, frame: Frame) -> &mut [f32] {
        let channels = self.channels;
        let start = frame * channels;
        &mut self.samples_mut()[start..start + channels]
    }

    /// Zeroes frames in `range`, clamped to the buffer length.
    pub fn clear(&mut self, range: Range<Frame>) {
        let end = range.end.min(self.frames);
        if range.start >= end {
            return;
        }
        let channels = self.channels;
        self.samples_mut()[range.start * channels..end * channels].fill(0.0);
    }

    pub fn clear_all(&mut self) {
        self.samples_mut().fill(0.0);
    }

    /// Adds `frames_to_copy` frames of `other`, read from `src_offset`, into
    /// this buffer starting at `dest_offset`. A mono source is spread across
    /// every destination channel.
    pub fn sum<T: AsRef<[f32]>>(
        &mut self,
        other: &AudioBuffer<T>,
        frames_to_copy: Frame,
        src_offset: Frame,
        dest_offset: Frame,
        gain: f32,
        pan: Pan,
    ) {
        self.mix(
            other,
            frames_to_copy,
            src_offset,
            dest_offset,
            gain,
            pan,
            |dest, value| *dest += value,
        );
    }

    /// Same as [`sum`](Self::sum) but overwrites instead of adding.
    pub fn set<T: AsRef<[f32]>>(
        &mut self,
        other: &AudioBuffer<T>,
        frames_to_copy: Frame,
        src_offset: Frame,
        dest_offset: Frame,
        gain: f32,
        pan: Pan,
    ) {
        self.mix(
            other,
            frames_to_copy,
            src_offset,
            dest_offset,
            gain,
            pan,
            |dest, value| *dest = value,
        );
    }

    pub fn apply_gain(&mut self, gain: f32) {
        for sample in self.samples_mut() {
            *sample *= gain;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn mix<T: AsRef<[f32]>>(
        &mut self,
        other: &AudioBuffer<T>,
        frames_to_copy: Frame,
        src_offset: Frame,
        dest_offset: Frame,
        gain: f32,
        pan: Pan,
        op: impl Fn(&mut f32, f32),
    ) {
        debug_assert!(
            other.channels() <= self.channels(),
            "source has more channels ({}) than destination ({})",
            other.channels(),
            self.channels()
        );

        if dest_offset >= self.frames || src_offset >= other.frames() {
            return;
        }
        let frames = frames_to_copy
            .min(self.frames - dest_offset)
            .min(other.frames() - src_offset);

        let src_channels = other.channels();
        let dest_channels = self.channels;
        let src = other.samples();
        let dest = self.samples_mut();

        for f in 0..frames {
            let s = (src_offset + f) * src_channels;
            let d = (dest_offset + f) * dest_channels;
            for ch in 0..dest_channels {
                let value = if src_channels == 1 {
                    src[s]
                } else if ch < src_channels {
                    src[s + ch]
                } else {
                    continue;
                };
                op(&mut dest[d + ch], value * gain * pan.gain(ch));
            }
        }
    }
}

impl<S: AsRef<[f32]>> Index<Frame> for AudioBuffer<S> {
    type Output = [f32];

    fn index(&self, frame: Frame) -> &[f32] {
        self.frame(frame)
    }
}

impl<S: AsRef<[f32]> + AsMut<[f32]>> IndexMut<Frame> for AudioBuffer<S> {
    fn index_mut(&mut self, frame: Frame) -> &mut [f32] {
        self.frame_mut(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(frames: Frame, channels: usize) -> AudioBuffer {
        let data = (0..frames * channels).map(|i| i as f32).collect();
        AudioBuffer::from_interleaved(data, channels)
    }

    #[test]
    fn test_alloc_free() {
        let mut buffer = AudioBuffer::new();
        assert!(!buffer.is_allocated());

        buffer.alloc(64, 2);
        assert_eq!(buffer.frames(), 64);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.samples().len(), 128);
        assert!(buffer.samples().iter().all(|s| *s == 0.0));

        buffer.free();
        assert_eq!(buffer.frames(), 0);
        assert!(!buffer.is_allocated());
    }

    #[test]
    fn test_index_returns_frame_channels() {
        let buffer = ramp(4, 2);
        assert_eq!(&buffer[0], &[0.0, 1.0]);
        assert_eq!(&buffer[3], &[6.0, 7.0]);
    }

    #[test]
    fn test_sum_spreads_mono_source() {
        let mut dest = AudioBuffer::from_interleaved(vec![1.0; 8], 2);
        let src = AudioBuffer::from_interleaved(vec![0.5, 1.0, 1.5, 2.0], 1);
        let pan = Pan {
            left: 1.0,
            right: 0.5,
        };

        dest.sum(&src, 4, 0, 0, 0.5, pan);

        for f in 0..4 {
            let mono = src.sample(f, 0);
            assert_relative_eq!(dest.sample(f, 0), 1.0 + mono * 0.5 * 1.0);
            assert_relative_eq!(dest.sample(f, 1), 1.0 + mono * 0.5 * 0.5);
        }
    }

    #[test]
    fn test_set_overwrites() {
        let mut dest = AudioBuffer::from_interleaved(vec![9.0; 8], 2);
        let src = ramp(4, 2);

        dest.set(&src, 4, 0, 0, 1.0, Pan::CENTER);

        assert_eq!(dest.samples(), src.samples());
    }

    #[test]
    fn test_mix_clamps_to_destination() {
        let mut dest = AudioBuffer::with_size(4, 2);
        let src = AudioBuffer::from_interleaved(vec![1.0; 20], 2);

        dest.sum(&src, 10, 0, 2, 1.0, Pan::CENTER);

        assert_eq!(dest.samples(), &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_mix_with_source_offset() {
        let mut dest = AudioBuffer::with_size(2, 2);
        let src = ramp(4, 2);

        dest.set(&src, 2, 2, 0, 1.0, Pan::CENTER);

        assert_eq!(dest.samples(), &[4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_mix_offsets_past_end_are_noops() {
        let mut dest = AudioBuffer::with_size(2, 2);
        let src = ramp(2, 2);

        dest.sum(&src, 2, 0, 2, 1.0, Pan::CENTER);
        dest.sum(&src, 2, 5, 0, 1.0, Pan::CENTER);

        assert_eq!(dest.peak(), 0.0);
    }

    #[test]
    fn test_clear_range() {
        let mut buffer = AudioBuffer::from_interleaved(vec![1.0; 8], 2);
        buffer.clear(2..100);
        assert_eq!(buffer.samples(), &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);

        buffer.clear(3..1);
        assert_eq!(buffer.sample(0, 0), 1.0);
    }

    #[test]
    fn test_peak_and_gain() {
        let mut buffer = AudioBuffer::from_interleaved(vec![0.25, -0.8, 0.5, 0.1], 2);
        assert_relative_eq!(buffer.peak(), 0.8);

        buffer.apply_gain(0.5);
        assert_relative_eq!(buffer.peak(), 0.4);
        assert_relative_eq!(buffer.sample(0, 0), 0.125);
    }

    #[test]
    fn test_views_over_external_memory() {
        let mut memory = vec![0.0_f32; 8];
        {
            let mut out = AudioBufferViewMut::view_mut(&mut memory, 4, 2);
            let src = AudioBuffer::from_interleaved(vec![1.0; 4], 1);
            out.sum(&src, 4, 0, 0, 1.0, Pan::CENTER);
        }
        assert!(memory.iter().all(|s| *s == 1.0));

        let input = AudioBufferView::view(&memory, 4, 2);
        assert_eq!(input.frames(), 4);
        assert_relative_eq!(input.peak(), 1.0);
    }

    #[test]
    fn test_view_truncates_to_whole_frames() {
        let memory = [0.0_f32; 5];
        let view = AudioBufferView::view(&memory[..], 2, 2);
        assert_eq!(view.frames(), 2);
        assert_eq!(view.samples().len(), 4);
    }

    #[test]
    fn test_pan_law() {
        assert_eq!(Pan::from_position(0.5), Pan::CENTER);

        let left = Pan::from_position(0.0);
        assert_relative_eq!(left.left, 1.0);
        assert_relative_eq!(left.right, 0.0);

        let right = Pan::from_position(0.75);
        assert_relative_eq!(right.left, 0.5);
        assert_relative_eq!(right.right, 1.0);
    }
}
