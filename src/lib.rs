//! # audio-channel
//!
//! Wait-free single-producer single-consumer channel for real-time audio
//! threads, plus the glue to play a WAV file through it.
//!
//! The core is [`channel`]: a bounded, fixed-capacity queue that moves
//! values between exactly two threads without locking, blocking, or
//! allocating. An audio callback must finish in bounded time no matter
//! what the rest of the process is doing, which rules out every mutex,
//! syscall, and allocator call on that path; the channel gets by with one
//! acquire load and one release store per operation.
//!
//! ## Quick Start
//!
//! ```
//! use audio_channel::channel;
//!
//! let (mut tx, mut rx) = channel::<f32>(1024)?;
//!
//! // Producer thread fills the channel...
//! tx.try_push(0.25).unwrap();
//!
//! // ...the audio thread drains it, substituting silence when empty.
//! let sample = rx.try_pop().unwrap_or(0.0);
//! assert_eq!(sample, 0.25);
//! # Ok::<(), audio_channel::ChannelError>(())
//! ```
//!
//! ## Architecture
//!
//! The playback pipeline keeps a strict thread boundary:
//!
//! - **File thread**: reads and decodes WAV blocks, may sleep and allocate
//! - **Block pool**: two SPSC channels recycling a fixed set of blocks
//! - **CPAL thread**: high-priority output callback that never blocks
//!
//! Filled blocks travel one way, drained blocks travel back, and the pool
//! owns all the memory up front - so the audio callback touches nothing
//! but shared memory and the two channel indices. When it finds the
//! channel empty it plays silence rather than waiting.
//!
//! The channel never sleeps, spins, or wakes anyone internally; full and
//! empty are immediate return values and retry policy belongs to the
//! caller (see [`RetryPolicy`]).

#![warn(missing_docs)]

mod block;
mod channel;
mod error;
mod playback;
mod player;
mod pool;
mod wav;

pub use block::Block;
pub use channel::{channel, Consumer, Producer};
pub use error::{ChannelError, PlaybackError};
pub use playback::{OutputDevice, PlaybackStream};
pub use player::{play_file, PlayerConfig, RetryPolicy};
pub use pool::{block_pool, BlockReceiver, BlockSender};
pub use wav::WavReader;
