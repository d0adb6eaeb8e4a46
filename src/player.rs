//! File-to-device playback orchestration.
//!
//! Ties the collaborators together the way the demonstration program
//! needs them: a [`WavReader`] feeding blocks through a [`block_pool`]
//! to an [`OutputDevice`] callback. The channel itself never waits, so
//! all retry behavior lives here, parameterized by [`RetryPolicy`].

use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::playback::OutputDevice;
use crate::pool::block_pool;
use crate::wav::WavReader;
use crate::PlaybackError;

/// What a caller does between failed channel operations.
///
/// The channel reports full/empty immediately and leaves waiting to its
/// callers; this is the explicit backoff policy the orchestration code
/// applies on its (non-real-time) side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Spin-hint and retry immediately. Lowest latency, burns a core.
    Spin,
    /// Yield the thread to the scheduler between attempts.
    Yield,
    /// Sleep a fixed interval between attempts.
    Sleep(Duration),
}

impl RetryPolicy {
    /// Pauses according to the policy before the caller retries.
    pub fn pause(&self) {
        match self {
            Self::Spin => std::hint::spin_loop(),
            Self::Yield => thread::yield_now(),
            Self::Sleep(interval) => thread::sleep(*interval),
        }
    }
}

impl Default for RetryPolicy {
    /// Sleep 10ms between attempts - a block at typical rates lasts far
    /// longer, so the feed loop stays comfortably ahead while using
    /// almost no CPU.
    fn default() -> Self {
        Self::Sleep(Duration::from_millis(10))
    }
}

/// Configuration for [`play_file`].
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Frames per block sent over the channel.
    pub frames_per_block: usize,
    /// Number of blocks in the recycling pool; also the channel capacity.
    pub pool_blocks: usize,
    /// Backoff applied by the feed loop when the pool has no free block
    /// or the ready channel is full.
    pub retry: RetryPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frames_per_block: 2048,
            pool_blocks: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Plays a PCM-16 WAV file to the default output device, blocking the
/// calling thread until the whole file has been handed to the device.
///
/// The calling thread is the producer: it reads blocks from the file and
/// commits them to the pool, retrying with `config.retry` when the pool
/// is momentarily out of blocks. The audio callback is the consumer.
///
/// # Errors
///
/// Fails on unreadable or non-PCM-16 files, on device/stream setup, or
/// if the pool cannot be constructed from `config`.
pub fn play_file(path: impl AsRef<Path>, config: &PlayerConfig) -> Result<(), PlaybackError> {
    let mut wav = WavReader::open(path.as_ref())?;
    let sample_rate = wav.sample_rate();
    let channels = wav.channels();

    let (mut sender, receiver) =
        block_pool(config.pool_blocks, config.frames_per_block, channels)?;

    let device = OutputDevice::open_default()?;
    tracing::info!(
        device = %device.name(),
        sample_rate,
        channels,
        frames_per_block = config.frames_per_block,
        "starting playback"
    );
    let stream = device.start_playback(receiver, sample_rate, channels)?;

    // Feed loop: acquire a recycled block, fill it from the file, commit
    // it. The final block is zero-padded by the reader.
    while !wav.is_exhausted() {
        let mut block = loop {
            match sender.acquire() {
                Some(block) => break block,
                None => config.retry.pause(),
            }
        };

        wav.read_block(block.samples_mut())?;

        let mut pending = block;
        loop {
            match sender.commit(pending) {
                Ok(()) => break,
                Err(block) => {
                    pending = block;
                    config.retry.pause();
                }
            }
        }
    }

    // Drain: once every block has come back through the pool, the callback
    // has copied the whole file out. One extra block of sleep lets the
    // device buffer itself empty.
    let mut reclaimed = 0;
    while reclaimed < config.pool_blocks {
        match sender.acquire() {
            Some(_) => reclaimed += 1,
            None => config.retry.pause(),
        }
    }
    thread::sleep(block_duration(config.frames_per_block, sample_rate));

    drop(stream);
    tracing::info!("playback finished");
    Ok(())
}

/// Wall-clock duration of one block at the given rate.
fn block_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.frames_per_block, 2048);
        assert_eq!(config.pool_blocks, 10);
        assert_eq!(config.retry, RetryPolicy::Sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_block_duration() {
        assert_eq!(
            block_duration(44100, 44100),
            Duration::from_secs(1)
        );
        assert_eq!(block_duration(2048, 0), Duration::ZERO);
    }

    #[test]
    fn test_retry_policies_return() {
        // Each policy must come back promptly; this is a smoke test that
        // none of them blocks indefinitely.
        RetryPolicy::Spin.pause();
        RetryPolicy::Yield.pause();
        RetryPolicy::Sleep(Duration::from_millis(1)).pause();
    }

    #[test]
    fn test_missing_file_is_a_file_error() {
        let err = play_file("/nonexistent/file.wav", &PlayerConfig::default()).unwrap_err();
        assert!(matches!(err, PlaybackError::FileError { .. }));
    }
}
