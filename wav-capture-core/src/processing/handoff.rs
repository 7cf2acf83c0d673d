//! Bounded, non-blocking block hand-off from the real-time callback to the
//! aggregator thread.
//!
//! Two bounded channels form a buffer pool:
//!
//! ```text
//!            free (pre-filled)              filled
//! [receiver] ───────────────→ [sender] ──────────────→ [receiver]
//!     ↑ recycle                  copy samples              │
//!     └────────────────────────────────────────────────────┘
//! ```
//!
//! The sending side only calls `try_recv` / `try_send` and copies into a
//! buffer that was allocated up front, so it never blocks and does not
//! allocate as long as the platform quantum fits the pre-sized buffers.
//! When no buffer is free the block is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::models::audio_models::SampleBlock;

/// Create a hand-off holding at most `capacity` in-flight blocks, each
/// buffer pre-sized for `quantum_size` samples.
pub fn block_channel(capacity: usize, quantum_size: usize) -> (BlockSender, BlockReceiver) {
    let capacity = capacity.max(1);
    let (filled_tx, filled_rx) = bounded::<Vec<f32>>(capacity);
    let (free_tx, free_rx) = bounded::<Vec<f32>>(capacity);

    for _ in 0..capacity {
        // Cannot fail: the pool channel has exactly `capacity` slots.
        let _ = free_tx.try_send(Vec::with_capacity(quantum_size));
    }

    let dropped = Arc::new(AtomicU64::new(0));
    let sender = BlockSender {
        filled_tx,
        free_rx,
        free_tx: free_tx.clone(),
        dropped: Arc::clone(&dropped),
    };
    let receiver = BlockReceiver {
        filled_rx,
        free_tx,
        dropped,
    };
    (sender, receiver)
}

/// Real-time half of the hand-off.
pub struct BlockSender {
    filled_tx: Sender<Vec<f32>>,
    free_rx: Receiver<Vec<f32>>,
    free_tx: Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
}

impl BlockSender {
    /// Copy `samples` into a pooled buffer and queue it. Returns `false` if
    /// the block was dropped.
    ///
    /// A quantum larger than the pooled capacity grows that buffer once;
    /// the grown buffer is then recycled.
    pub fn forward(&self, samples: &[f32]) -> bool {
        let Ok(mut buf) = self.free_rx.try_recv() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        buf.clear();
        buf.extend_from_slice(samples);

        match self.filled_tx.try_send(buf) {
            Ok(()) => true,
            Err(TrySendError::Full(buf)) | Err(TrySendError::Disconnected(buf)) => {
                let _ = self.free_tx.try_send(buf);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The sending half is gone and every queued block has been taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffClosed;

/// Aggregator half of the hand-off.
pub struct BlockReceiver {
    filled_rx: Receiver<Vec<f32>>,
    free_tx: Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
}

impl BlockReceiver {
    /// Wait up to `timeout` for the next block.
    ///
    /// Returns `Ok(None)` on timeout. Once the sender is gone and the queue
    /// is empty this returns `HandoffClosed` immediately, so callers must not
    /// loop on it.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<SampleBlock>, HandoffClosed> {
        match self.filled_rx.recv_timeout(timeout) {
            Ok(buf) => Ok(Some(self.take(buf))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(HandoffClosed),
        }
    }

    /// Take the next already-queued block without waiting.
    pub fn try_recv(&self) -> Option<SampleBlock> {
        let buf = self.filled_rx.try_recv().ok()?;
        Some(self.take(buf))
    }

    /// Blocks waiting to be taken.
    pub fn pending(&self) -> usize {
        self.filled_rx.len()
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn take(&self, buf: Vec<f32>) -> SampleBlock {
        let block = SampleBlock::from(buf.as_slice());
        let _ = self.free_tx.try_send(buf);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_arrive_in_order() {
        let (tx, rx) = block_channel(4, 2);
        assert!(tx.forward(&[0.1, 0.2]));
        assert!(tx.forward(&[0.3, 0.4]));

        assert_eq!(rx.pending(), 2);
        assert_eq!(rx.try_recv().unwrap().samples(), &[0.1, 0.2]);
        assert_eq!(rx.try_recv().unwrap().samples(), &[0.3, 0.4]);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn exhausted_pool_drops_and_counts() {
        let (tx, rx) = block_channel(2, 1);
        assert!(tx.forward(&[0.1]));
        assert!(tx.forward(&[0.2]));
        assert!(!tx.forward(&[0.3]));

        assert_eq!(tx.dropped_blocks(), 1);
        assert_eq!(rx.dropped_blocks(), 1);

        // Taking a block recycles its buffer.
        assert_eq!(rx.try_recv().unwrap().samples(), &[0.1]);
        assert!(tx.forward(&[0.4]));
        assert_eq!(rx.try_recv().unwrap().samples(), &[0.2]);
        assert_eq!(rx.try_recv().unwrap().samples(), &[0.4]);
    }

    #[test]
    fn oversized_quantum_is_forwarded_whole() {
        let (tx, rx) = block_channel(1, 2);
        let big = vec![0.5f32; 300];
        assert!(tx.forward(&big));
        assert_eq!(rx.try_recv().unwrap().len(), 300);
    }

    #[test]
    fn recv_timeout_returns_none_when_idle() {
        let (_tx, rx) = block_channel(1, 8);
        assert_eq!(rx.recv_timeout(Duration::from_millis(5)).map(|b| b.is_none()), Ok(true));
    }

    #[test]
    fn dropped_sender_closes_after_queue_is_drained() {
        let (tx, rx) = block_channel(2, 1);
        tx.forward(&[0.3]);
        drop(tx);

        let block = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(block.samples(), &[0.3]);

        let started = std::time::Instant::now();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Err(HandoffClosed));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn received_block_is_independent_of_pooled_buffer() {
        let (tx, rx) = block_channel(1, 2);
        tx.forward(&[0.1, 0.2]);
        let first = rx.try_recv().unwrap();
        tx.forward(&[0.9, 0.9]);
        let second = rx.try_recv().unwrap();

        assert_eq!(first.samples(), &[0.1, 0.2]);
        assert_eq!(second.samples(), &[0.9, 0.9]);
    }
}
