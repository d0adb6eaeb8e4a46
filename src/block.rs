//! Fixed-size audio block, the payload recycled through the pool.

use std::fmt;

/// A fixed-length block of interleaved 16-bit PCM samples.
///
/// `Block` is the unit of audio handed from the file-reading thread to the
/// audio callback. Every block in a pool has the same length, so the
/// storage is allocated once at startup and only the (pointer-sized) block
/// moves through the channels afterwards - nothing allocates on the
/// real-time path.
///
/// A block read from the end of a file keeps its full length; the reader
/// zero-fills the unused tail so the callback never has to special-case a
/// short block.
pub struct Block {
    /// Interleaved PCM samples, `frames * channels` long.
    samples: Box<[i16]>,
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    channels: u16,
}

impl Block {
    /// Creates a silent block of `frames * channels` samples.
    pub fn zeroed(frames: usize, channels: u16) -> Self {
        Self {
            samples: vec![0i16; frames * channels as usize].into_boxed_slice(),
            channels,
        }
    }

    /// Returns the number of audio frames in this block.
    ///
    /// A frame contains one sample per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the interleaved samples for writing.
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Overwrites the whole block with silence.
    pub fn fill_silence(&mut self) {
        self.samples.fill(0);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("frames", &self.frames())
            .field("channels", &self.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_block_dimensions() {
        let block = Block::zeroed(2048, 2);
        assert_eq!(block.frames(), 2048);
        assert_eq!(block.channels(), 2);
        assert_eq!(block.samples().len(), 4096);
        assert!(block.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_fill_silence() {
        let mut block = Block::zeroed(4, 1);
        block.samples_mut().copy_from_slice(&[1, 2, 3, 4]);
        block.fill_silence();
        assert_eq!(block.samples(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_zero_channels() {
        let block = Block::zeroed(16, 0);
        assert_eq!(block.frames(), 0);
        assert!(block.samples().is_empty());
    }
}
