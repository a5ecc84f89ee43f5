//! Default-device output stream.
//!
//! [`LiveOutput`] wires the whole live path together: it queries the
//! default device, sizes a lock-free ring for it, spawns the feeder
//! thread on the producer side, and builds a cpal stream whose callback
//! drains the consumer side. The callback only copies and converts;
//! every sample is generated on the feeder thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Split};
use ringbuf::HeapRb;
use tracing::{debug, error};

use gapsong_engine::BLOCK_FRAMES;

use crate::error::{PlaybackError, PlaybackResult};
use crate::feeder::{FeederCommand, FeederHandle, FeederThread};

/// A running output stream with its feeder thread.
///
/// Dropping it joins the feeder and tears the stream down; anything
/// still in the ring is discarded.
pub(crate) struct LiveOutput {
    feeder: FeederHandle,
    _stream: cpal::Stream,
    sample_rate: u32,
}

impl LiveOutput {
    /// Opens the default output device and starts streaming silence.
    pub(crate) fn open() -> PlaybackResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels()).max(1);

        // About 150 ms of headroom, never smaller than a few feeder blocks
        let capacity = (sample_rate as usize * 3 / 20).max(BLOCK_FRAMES * 4) * channels;
        let ring = HeapRb::<f32>::new(capacity);
        let (producer, mut consumer) = ring.split();

        // The feeder goes up first so the callbacks can signal its condvar
        let feeder = FeederThread::spawn(producer, channels);
        let condvar_f32 = feeder.condvar.clone();
        let condvar_i16 = feeder.condvar.clone();
        let condvar_u16 = feeder.condvar.clone();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let config = config.into();
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let popped = consumer.pop_slice(data);
                        data[popped..].fill(0.0);

                        // Room opened up; wake the feeder
                        let (_lock, cvar) = &*condvar_f32;
                        cvar.notify_one();
                    },
                    |err| error!("output stream error: {}", err),
                    None,
                )?
            }
            cpal::SampleFormat::I16 => {
                let config = config.into();
                let mut scratch: Vec<f32> = vec![0.0; 4096];
                device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        if scratch.len() < data.len() {
                            scratch.resize(data.len(), 0.0);
                        }
                        let popped = consumer.pop_slice(&mut scratch[..data.len()]);
                        for (out, &value) in data.iter_mut().zip(&scratch[..popped]) {
                            *out = (value * 32767.0).clamp(-32768.0, 32767.0) as i16;
                        }
                        for out in &mut data[popped..] {
                            *out = 0;
                        }

                        let (_lock, cvar) = &*condvar_i16;
                        cvar.notify_one();
                    },
                    |err| error!("output stream error: {}", err),
                    None,
                )?
            }
            cpal::SampleFormat::U16 => {
                let config = config.into();
                let mut scratch: Vec<f32> = vec![0.0; 4096];
                device.build_output_stream(
                    &config,
                    move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                        if scratch.len() < data.len() {
                            scratch.resize(data.len(), 0.0);
                        }
                        let popped = consumer.pop_slice(&mut scratch[..data.len()]);
                        for (out, &value) in data.iter_mut().zip(&scratch[..popped]) {
                            *out = ((value * 32767.0 + 32768.0).clamp(0.0, 65535.0)) as u16;
                        }
                        // Unsigned silence sits mid-range
                        for out in &mut data[popped..] {
                            *out = 32768;
                        }

                        let (_lock, cvar) = &*condvar_u16;
                        cvar.notify_one();
                    },
                    |err| error!("output stream error: {}", err),
                    None,
                )?
            }
            other => return Err(PlaybackError::UnsupportedSampleFormat(other)),
        };

        stream.play()?;
        debug!(
            "output stream started at {} Hz, {} channels",
            sample_rate, channels
        );

        Ok(Self {
            feeder,
            _stream: stream,
            sample_rate,
        })
    }

    /// The device sample rate sessions must be built at.
    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Queues a command for the feeder thread.
    pub(crate) fn send(&self, command: FeederCommand) -> PlaybackResult<()> {
        self.feeder.send(command)
    }

    /// True while a piece is playing or draining.
    pub(crate) fn is_busy(&self) -> bool {
        self.feeder.is_busy()
    }

    /// True while the feeder thread is running.
    pub(crate) fn is_alive(&self) -> bool {
        self.feeder.is_alive()
    }
}
