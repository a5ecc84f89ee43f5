//! Convolution reverb.
//!
//! The wet path convolves the mono bus with a stereo noise-burst
//! impulse response. Convolution runs in the frequency domain using
//! uniform partitioning: the impulse is split into block-sized
//! partitions, each input block is transformed once, and every output
//! block is the sum of partition spectra multiplied against a ring of
//! recent input spectra. Cost per block stays flat no matter how long
//! the impulse is.

use rand::Rng;
use rand_pcg::Pcg32;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Length of the reverb impulse response in seconds.
pub const IMPULSE_SECONDS: f64 = 3.0;

/// Generates one channel of decaying noise.
fn decaying_noise(len: usize, rng: &mut Pcg32) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let fade = (1.0 - i as f64 / len as f64).powi(4);
            (rng.gen::<f64>() * 2.0 - 1.0) * fade
        })
        .collect()
}

/// Scales a channel to unit energy.
fn normalize_energy(channel: &mut [f64]) {
    let energy: f64 = channel.iter().map(|s| s * s).sum();
    if energy > 0.0 {
        let scale = 1.0 / energy.sqrt();
        for sample in channel.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Generates the stereo reverb impulse: independent decaying noise per
/// channel, each normalized to unit energy.
pub fn reverb_impulse(sample_rate: f64, rng: &mut Pcg32) -> (Vec<f64>, Vec<f64>) {
    let len = ((IMPULSE_SECONDS * sample_rate) as usize).max(1);
    let mut left = decaying_noise(len, rng);
    let mut right = decaying_noise(len, rng);
    normalize_energy(&mut left);
    normalize_energy(&mut right);
    (left, right)
}

fn partition_impulse(
    impulse: &[f64],
    block_size: usize,
    fft_size: usize,
    forward: &dyn Fft<f64>,
) -> Vec<Vec<Complex<f64>>> {
    impulse
        .chunks(block_size)
        .map(|chunk| {
            let mut spectrum = vec![Complex::new(0.0, 0.0); fft_size];
            for (slot, &sample) in spectrum.iter_mut().zip(chunk.iter()) {
                slot.re = sample;
            }
            forward.process(&mut spectrum);
            spectrum
        })
        .collect()
}

/// Mono-in, stereo-out partitioned FFT convolver.
pub struct StereoConvolver {
    block_size: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    partitions_left: Vec<Vec<Complex<f64>>>,
    partitions_right: Vec<Vec<Complex<f64>>>,
    // Ring of recent input spectra; `head` is the newest entry
    history: Vec<Vec<Complex<f64>>>,
    head: usize,
    acc_left: Vec<Complex<f64>>,
    acc_right: Vec<Complex<f64>>,
    // Second half of the previous inverse transform, one block each
    overlap_left: Vec<f64>,
    overlap_right: Vec<f64>,
}

impl StereoConvolver {
    /// Creates a convolver for the given impulse response pair.
    ///
    /// Both channels are padded to the same partition count. Inputs to
    /// [`process_add`](Self::process_add) must arrive in blocks of
    /// exactly `block_size` samples.
    pub fn new(impulse_left: &[f64], impulse_right: &[f64], block_size: usize) -> Self {
        let fft_size = block_size * 2;
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let mut partitions_left =
            partition_impulse(impulse_left, block_size, fft_size, forward.as_ref());
        let mut partitions_right =
            partition_impulse(impulse_right, block_size, fft_size, forward.as_ref());
        let count = partitions_left.len().max(partitions_right.len()).max(1);
        partitions_left.resize_with(count, || vec![Complex::new(0.0, 0.0); fft_size]);
        partitions_right.resize_with(count, || vec![Complex::new(0.0, 0.0); fft_size]);

        let history = vec![vec![Complex::new(0.0, 0.0); fft_size]; count];

        Self {
            block_size,
            fft_size,
            forward,
            inverse,
            partitions_left,
            partitions_right,
            history,
            head: 0,
            acc_left: vec![Complex::new(0.0, 0.0); fft_size],
            acc_right: vec![Complex::new(0.0, 0.0); fft_size],
            overlap_left: vec![0.0; block_size],
            overlap_right: vec![0.0; block_size],
        }
    }

    /// Blocks of silence needed to flush the remaining tail once the
    /// input goes quiet.
    pub fn tail_blocks(&self) -> usize {
        self.history.len() + 1
    }

    /// Convolves one input block and adds the wet result into both
    /// output blocks. All three slices must be `block_size` long.
    pub fn process_add(&mut self, input: &[f64], out_left: &mut [f64], out_right: &mut [f64]) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(out_left.len(), self.block_size);
        debug_assert_eq!(out_right.len(), self.block_size);

        // Step the ring back and overwrite the oldest slot with the
        // spectrum of the incoming block
        let count = self.history.len();
        self.head = (self.head + count - 1) % count;
        let spectrum = &mut self.history[self.head];
        for slot in spectrum.iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }
        for (slot, &sample) in spectrum.iter_mut().zip(input.iter()) {
            slot.re = sample;
        }
        self.forward.process(spectrum);

        // Accumulate partition * delayed-input products
        for slot in self.acc_left.iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }
        for slot in self.acc_right.iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }
        for (age, (h_left, h_right)) in self
            .partitions_left
            .iter()
            .zip(self.partitions_right.iter())
            .enumerate()
        {
            let delayed = &self.history[(self.head + age) % count];
            for i in 0..self.fft_size {
                self.acc_left[i] += h_left[i] * delayed[i];
                self.acc_right[i] += h_right[i] * delayed[i];
            }
        }

        self.inverse.process(&mut self.acc_left);
        self.inverse.process(&mut self.acc_right);

        // rustfft does not normalize the inverse transform
        let scale = 1.0 / self.fft_size as f64;
        for i in 0..self.block_size {
            out_left[i] += self.acc_left[i].re * scale + self.overlap_left[i];
            out_right[i] += self.acc_right[i].re * scale + self.overlap_right[i];
            self.overlap_left[i] = self.acc_left[i + self.block_size].re * scale;
            self.overlap_right[i] = self.acc_right[i + self.block_size].re * scale;
        }
    }
}
