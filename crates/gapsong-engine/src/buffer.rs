//! Stereo sample buffer.

/// Non-interleaved stereo output, one `Vec<f64>` per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    /// Left channel samples.
    pub left: Vec<f64>,
    /// Right channel samples.
    pub right: Vec<f64>,
}

impl StereoBuffer {
    /// Creates a silent buffer holding `frames` frames.
    pub fn new(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Number of frames. If the channels ever differ in length the
    /// shorter one wins.
    pub fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds at the given sample rate.
    pub fn duration_seconds(&self, sample_rate: u32) -> f64 {
        self.len() as f64 / f64::from(sample_rate)
    }

    /// Peak absolute sample value across both channels.
    pub fn peak(&self) -> f64 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0, |peak, &sample| peak.max(sample.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_silent() {
        let buffer = StereoBuffer::new(64);
        assert_eq!(buffer.len(), 64);
        assert!(!buffer.is_empty());
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_duration() {
        let buffer = StereoBuffer::new(44100);
        assert!((buffer.duration_seconds(44100) - 1.0).abs() < 1e-12);
        assert!((buffer.duration_seconds(22050) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_peak_spans_both_channels() {
        let mut buffer = StereoBuffer::new(4);
        buffer.left[1] = 0.25;
        buffer.right[3] = -0.75;
        assert_eq!(buffer.peak(), 0.75);
    }

    #[test]
    fn test_len_uses_shorter_channel() {
        let buffer = StereoBuffer {
            left: vec![0.0; 10],
            right: vec![0.0; 7],
        };
        assert_eq!(buffer.len(), 7);
    }
}
