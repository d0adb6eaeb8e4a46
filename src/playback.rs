//! CPAL device wrapper for audio playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig as CpalStreamConfig};

use crate::error::PlaybackError;
use crate::pool::BlockReceiver;
use crate::Block;

/// Scale factor for i16 -> f32 conversion.
const I16_SCALE: f32 = 1.0 / 32768.0;

/// Wrapper around a CPAL audio output device.
///
/// This handles device selection and stream configuration, and wires the
/// block pool's receiving end into the output callback.
#[must_use]
pub struct OutputDevice {
    device: Device,
}

impl OutputDevice {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultDevice` if no default output device is configured.
    pub fn open_default() -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoDefaultDevice)?;

        Ok(Self { device })
    }

    /// Opens a specific output device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| PlaybackError::BackendError(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(Self { device });
                }
            }
        }

        Err(PlaybackError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Starts playing blocks from `receiver` and returns a running stream.
    ///
    /// The returned `PlaybackStream` must be kept alive for playback to
    /// continue. The output callback pops blocks, copies their samples
    /// into the device buffer, and returns drained blocks to the pool; if
    /// the channel is empty it writes silence and carries on - it never
    /// waits for the producer.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSampleRate` if the device cannot play at the
    /// requested rate and channel count, `UnsupportedFormat` for devices
    /// that offer neither i16 nor f32 output, and `BackendError` if the
    /// stream cannot be built or started.
    pub fn start_playback(
        &self,
        receiver: BlockReceiver,
        sample_rate: u32,
        channels: u16,
    ) -> Result<PlaybackStream, PlaybackError> {
        let sample_format = self.pick_sample_format(sample_rate, channels)?;

        let config = CpalStreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // Build stream based on sample format
        let stream = match sample_format {
            SampleFormat::I16 => self.build_i16_stream(&config, receiver)?,
            SampleFormat::F32 => self.build_f32_stream(&config, receiver)?,
            format => {
                return Err(PlaybackError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream
            .play()
            .map_err(|e| PlaybackError::BackendError(e.to_string()))?;

        Ok(PlaybackStream { _stream: stream })
    }

    /// Finds a supported output configuration matching the requested rate
    /// and channel count.
    fn pick_sample_format(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<SampleFormat, PlaybackError> {
        let ranges = self
            .device
            .supported_output_configs()
            .map_err(|e| PlaybackError::BackendError(e.to_string()))?;

        let mut available = Vec::new();
        for range in ranges {
            if range.channels() != channels {
                continue;
            }
            let (min, max) = (range.min_sample_rate().0, range.max_sample_rate().0);
            if (min..=max).contains(&sample_rate) {
                return Ok(range.sample_format());
            }
            available.push(min);
            if max != min {
                available.push(max);
            }
        }

        available.sort_unstable();
        available.dedup();
        Err(PlaybackError::UnsupportedSampleRate {
            requested: sample_rate,
            available,
        })
    }

    fn build_i16_stream(
        &self,
        config: &CpalStreamConfig,
        receiver: BlockReceiver,
    ) -> Result<Stream, PlaybackError> {
        let mut cursor = BlockCursor::new(receiver);
        let stream = self
            .device
            .build_output_stream(
                config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    cursor.fill(data, |sample| sample);
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| PlaybackError::BackendError(e.to_string()))?;

        Ok(stream)
    }

    fn build_f32_stream(
        &self,
        config: &CpalStreamConfig,
        receiver: BlockReceiver,
    ) -> Result<Stream, PlaybackError> {
        let mut cursor = BlockCursor::new(receiver);
        let stream = self
            .device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Inline conversion to avoid per-sample call overhead
                    cursor.fill(data, |sample| f32::from(sample) * I16_SCALE);
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| PlaybackError::BackendError(e.to_string()))?;

        Ok(stream)
    }
}

/// A running audio playback stream.
///
/// Playback continues while this struct is held. When dropped, the CPAL
/// stream is automatically stopped and resources are released.
///
/// This is a simple RAII wrapper - the stream runs while this exists.
pub struct PlaybackStream {
    /// The underlying CPAL stream. Dropping this stops playback.
    _stream: Stream,
}

/// Callback-side cursor over the stream of filled blocks.
///
/// CPAL does not guarantee a fixed callback buffer length, so a block may
/// be drained across several callbacks; the cursor remembers where it
/// stopped. Everything here is wait-free: a pop, a copy, a release. When
/// the channel runs empty mid-buffer the rest is filled with silence.
struct BlockCursor {
    receiver: BlockReceiver,
    /// Block currently being drained, if any.
    current: Option<Block>,
    /// Samples of `current` already copied out.
    offset: usize,
}

impl BlockCursor {
    fn new(receiver: BlockReceiver) -> Self {
        Self {
            receiver,
            current: None,
            offset: 0,
        }
    }

    /// Fills `out` from queued blocks, converting each sample with
    /// `convert`, substituting silence once the channel is empty.
    fn fill<S, F>(&mut self, out: &mut [S], convert: F)
    where
        F: Fn(i16) -> S,
    {
        let mut filled = 0;
        while filled < out.len() {
            let block = match self.current.take() {
                Some(block) => block,
                None => match self.receiver.recv() {
                    Some(block) => {
                        self.offset = 0;
                        block
                    }
                    None => {
                        // Channel empty: deterministic silence, never a stall.
                        for slot in &mut out[filled..] {
                            *slot = convert(0);
                        }
                        return;
                    }
                },
            };

            let samples = block.samples();
            let count = (samples.len() - self.offset).min(out.len() - filled);
            for (dst, &src) in out[filled..filled + count]
                .iter_mut()
                .zip(&samples[self.offset..self.offset + count])
            {
                *dst = convert(src);
            }
            filled += count;
            self.offset += count;

            if self.offset == samples.len() {
                self.receiver.release(block);
            } else {
                self.current = Some(block);
            }
        }
    }
}
