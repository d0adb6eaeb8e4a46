//! Block pool: allocation-free recycling of audio blocks.
//!
//! The playback pipeline needs per-block memory but must never allocate on
//! the audio thread. The pool solves this with two SPSC channels running in
//! opposite directions between the same pair of threads:
//!
//! ```text
//!                    ready (filled blocks)
//!    file thread  ─────────────────────────▶  audio callback
//!                 ◀─────────────────────────
//!                    free (drained blocks)
//! ```
//!
//! All blocks are allocated up front and parked on the `free` channel.
//! Ownership of each block moves around this loop for the life of the
//! pool; custody is transferred through the channels, so neither side can
//! touch a block the other is working on.
//!
//! Both channels are sized to hold every block at once, so returning a
//! block always succeeds on the first try - the audio callback never has
//! to retry a release.

use crate::channel::{channel, Consumer, Producer};
use crate::error::ChannelError;
use crate::Block;

/// Creates a pool of `blocks` silent blocks, each `frames_per_block`
/// frames of `channels` interleaved channels.
///
/// Returns the two ends of the recycling loop: a [`BlockSender`] for the
/// thread that fills blocks and a [`BlockReceiver`] for the thread that
/// drains them.
///
/// # Errors
///
/// Returns [`ChannelError::InvalidCapacity`] if `blocks` is zero.
pub fn block_pool(
    blocks: usize,
    frames_per_block: usize,
    channels: u16,
) -> Result<(BlockSender, BlockReceiver), ChannelError> {
    let (ready_tx, ready_rx) = channel::<Block>(blocks)?;
    let (mut free_tx, free_rx) = channel::<Block>(blocks)?;

    for _ in 0..blocks {
        // Cannot fail: the channel was sized to hold all of them.
        let _ = free_tx.try_push(Block::zeroed(frames_per_block, channels));
    }

    Ok((
        BlockSender {
            ready: ready_tx,
            free: free_rx,
        },
        BlockReceiver {
            ready: ready_rx,
            free: free_tx,
        },
    ))
}

/// The filling side of a block pool.
///
/// Owned by the thread that produces audio (the file reader). Acquire a
/// recycled block, fill it, commit it.
#[derive(Debug)]
pub struct BlockSender {
    ready: Producer<Block>,
    free: Consumer<Block>,
}

impl BlockSender {
    /// Takes a recycled block, or `None` if every block is still in
    /// flight. The caller chooses its own retry policy.
    pub fn acquire(&mut self) -> Option<Block> {
        self.free.try_pop()
    }

    /// Queues a filled block for the consuming side.
    ///
    /// Returns the block back as `Err` if the ready channel is full. With
    /// blocks obtained from [`acquire`](Self::acquire) this can only
    /// happen transiently while the consumer is between pops.
    pub fn commit(&mut self, block: Block) -> Result<(), Block> {
        self.ready.try_push(block)
    }

    /// Returns the total number of blocks in the pool.
    pub fn pool_size(&self) -> usize {
        self.ready.capacity()
    }
}

/// The draining side of a block pool.
///
/// Owned by the consuming thread (the audio callback). Receive a filled
/// block, copy it out, release it for reuse.
#[derive(Debug)]
pub struct BlockReceiver {
    ready: Consumer<Block>,
    free: Producer<Block>,
}

impl BlockReceiver {
    /// Takes the next filled block, or `None` if nothing is queued.
    ///
    /// An empty pool is the steady-state "produce silence" signal for an
    /// audio callback, not an error.
    pub fn recv(&mut self) -> Option<Block> {
        self.ready.try_pop()
    }

    /// Returns a drained block to the pool for reuse.
    ///
    /// Wait-free and infallible for blocks that came out of this pool: the
    /// free channel holds the whole pool, so the push always lands. A
    /// foreign block that would overflow the pool is dropped instead.
    pub fn release(&mut self, block: Block) {
        let _ = self.free.try_push(block);
    }

    /// Returns the total number of blocks in the pool.
    pub fn pool_size(&self) -> usize {
        self.ready.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_starts_with_all_blocks_free() {
        let (mut sender, _receiver) = block_pool(3, 16, 1).unwrap();

        assert!(sender.acquire().is_some());
        assert!(sender.acquire().is_some());
        assert!(sender.acquire().is_some());
        assert!(sender.acquire().is_none());
    }

    #[test]
    fn blocks_cycle_through_the_loop() {
        let (mut sender, mut receiver) = block_pool(2, 4, 1).unwrap();

        // Nothing queued yet.
        assert!(receiver.recv().is_none());

        let mut block = sender.acquire().unwrap();
        block.samples_mut().copy_from_slice(&[10, 20, 30, 40]);
        sender.commit(block).unwrap();

        let block = receiver.recv().unwrap();
        assert_eq!(block.samples(), &[10, 20, 30, 40]);
        receiver.release(block);

        // Released block is available again; pool never shrinks.
        assert!(sender.acquire().is_some());
        assert!(sender.acquire().is_some());
        assert!(sender.acquire().is_none());
    }

    #[test]
    fn release_is_infallible_for_pool_blocks() {
        let (mut sender, mut receiver) = block_pool(4, 8, 2).unwrap();

        // Move every block to the consuming side, then return them all.
        let mut in_flight = Vec::new();
        while let Some(block) = sender.acquire() {
            sender.commit(block).unwrap();
            in_flight.push(receiver.recv().unwrap());
        }
        assert_eq!(in_flight.len(), 4);

        for block in in_flight {
            receiver.release(block);
        }
        assert_eq!(sender.pool_size(), 4);
        assert!(sender.acquire().is_some());
    }

    #[test]
    fn zero_blocks_is_rejected() {
        assert!(block_pool(0, 128, 2).is_err());
    }
}
