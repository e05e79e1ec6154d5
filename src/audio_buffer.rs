use crate::error::{CutterError, Result};

/// Decoded audio: planar `f32` channels at a fixed sample rate.
///
/// A buffer is read-only once produced. Editing operations such as
/// [crate::trim::extract_region] always allocate a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a buffer from planar channel data.
    ///
    /// # Errors
    ///
    /// Fails if there are no channels, the sample rate is zero or the channels differ in length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(CutterError::InvalidBuffer("no channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(CutterError::InvalidBuffer("sample rate is zero".to_string()));
        }
        let expected = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != expected)
        {
            return Err(CutterError::InvalidBuffer(format!(
                "channel {} has {} frames, expected {}",
                index,
                channel.len(),
                expected
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Creates a buffer from interleaved samples. A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(CutterError::InvalidBuffer("no channels".to_string()));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Returns samples interleaved frame by frame, as rodio and hound expect them.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channel_count());
        for i in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Converts a time in seconds to a frame index with `floor(seconds * sample_rate)`.
    ///
    /// The result is clamped into `[0, frames]`; any time at or past the duration maps to
    /// `frames` so that a region ending at the duration covers the last frame.
    pub fn frame_at(&self, seconds: f64) -> usize {
        if seconds.is_nan() || seconds <= 0.0 {
            return 0;
        }
        if seconds >= self.duration_secs() {
            return self.frames();
        }
        let index = (seconds * self.sample_rate as f64).floor() as usize;
        index.min(self.frames())
    }

    /// Min/max pairs over `bins` equal slices of the buffer, taken across all channels.
    pub fn peaks(&self, bins: usize) -> Vec<(f32, f32)> {
        let frames = self.frames();
        if bins == 0 || frames == 0 {
            return Vec::new();
        }
        (0..bins)
            .map(|bin| {
                let start = bin * frames / bins;
                let end = ((bin + 1) * frames / bins).max(start + 1).min(frames);
                let mut min = 0.0f32;
                let mut max = 0.0f32;
                for channel in &self.channels {
                    for &v in &channel[start..end] {
                        min = min.min(v);
                        max = max.max(v);
                    }
                }
                (min, max)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(frames: usize, channels: usize, sample_rate: u32) -> AudioBuffer {
        let data = (0..channels)
            .map(|c| (0..frames).map(|i| (i + c) as f32 / frames as f32).collect())
            .collect();
        AudioBuffer::new(data, sample_rate).unwrap()
    }

    #[test]
    fn rejects_mismatched_channels() {
        let err = AudioBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100).unwrap_err();
        assert!(matches!(err, CutterError::InvalidBuffer(_)));
    }

    #[test]
    fn rejects_zero_sample_rate_and_no_channels() {
        assert!(AudioBuffer::new(vec![vec![0.0; 4]], 0).is_err());
        assert!(AudioBuffer::new(Vec::new(), 44100).is_err());
    }

    #[test]
    fn interleaving_preserves_frame_order() {
        let buffer = AudioBuffer::from_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0], 2, 8000).unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[1.0, 2.0]);
        assert_eq!(buffer.channel(1).unwrap(), &[-1.0, -2.0]);
        assert_eq!(buffer.interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn duration_follows_frames_and_rate() {
        let buffer = ramp(44100 * 3, 1, 44100);
        assert_relative_eq!(buffer.duration_secs(), 3.0);
    }

    #[test]
    fn frame_at_floors_and_clamps() {
        let buffer = ramp(100, 1, 10);
        assert_eq!(buffer.frame_at(-1.0), 0);
        assert_eq!(buffer.frame_at(0.0), 0);
        assert_eq!(buffer.frame_at(0.39), 3);
        assert_eq!(buffer.frame_at(10.0), 100);
        assert_eq!(buffer.frame_at(50.0), 100);
        assert_eq!(buffer.frame_at(f64::NAN), 0);
    }

    #[test]
    fn peaks_cover_whole_buffer() {
        let mut data = vec![0.0f32; 100];
        data[10] = 0.9;
        data[90] = -0.7;
        let buffer = AudioBuffer::new(vec![data], 100).unwrap();
        let peaks = buffer.peaks(4);
        assert_eq!(peaks.len(), 4);
        assert_relative_eq!(peaks[0].1, 0.9);
        assert_relative_eq!(peaks[3].0, -0.7);
        assert_eq!(peaks[1], (0.0, 0.0));
    }
}
