use std::sync::{Mutex, MutexGuard, PoisonError};

use frame_filter_common::frame::TimestampedFrame;
use tracing::{debug, warn};

/// Single-slot, overwrite-on-arrival hand-off between the capture thread and
/// the display consumer.
///
/// The slot holds at most one unread frame. Publishing replaces it, so a slow
/// consumer only ever sees the newest finished frame and memory use stays
/// bounded at one frame regardless of the producer/consumer speed mismatch.
/// Neither side blocks for longer than a pointer swap.
#[derive(Debug, Default)]
pub struct FrameExchange {
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    latest: Option<TimestampedFrame>,
    /// Sequence number of the newest frame ever accepted.
    last_seq: Option<u64>,
    stats: ExchangeStats,
}

/// Counters describing what happened to published frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Frames accepted into the slot.
    pub published: u64,
    /// Accepted frames replaced before the consumer read them.
    pub overwritten: u64,
    /// Frames refused because a newer one had already been accepted.
    pub stale: u64,
    /// Frames handed to the consumer.
    pub taken: u64,
}

/// Outcome of [`FrameExchange::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The slot was empty.
    Fresh,
    /// An unread frame was dropped to make room.
    Overwrote { dropped_seq: u64 },
    /// The frame is older than one already accepted and was discarded.
    Stale { latest_seq: u64 },
}

impl FrameExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a finished frame to the consumer, replacing any unread one.
    pub fn publish(&self, frame: TimestampedFrame) -> Publish {
        let mut slot = self.lock();

        if let Some(latest_seq) = slot.last_seq.filter(|&last| frame.seq <= last) {
            slot.stats.stale += 1;
            warn!(seq = frame.seq, latest_seq, "refusing out-of-order frame");
            return Publish::Stale { latest_seq };
        }

        let seq = frame.seq;
        slot.last_seq = Some(seq);
        slot.stats.published += 1;
        match slot.latest.replace(frame) {
            Some(dropped) => {
                slot.stats.overwritten += 1;
                debug!(seq, dropped_seq = dropped.seq, "frame published, unread frame dropped");
                Publish::Overwrote {
                    dropped_seq: dropped.seq,
                }
            }
            None => {
                debug!(seq, "frame published");
                Publish::Fresh
            }
        }
    }

    /// Take the newest unread frame, if any. Never blocks waiting for one.
    pub fn take_latest(&self) -> Option<TimestampedFrame> {
        let mut slot = self.lock();
        let frame = slot.latest.take();
        if frame.is_some() {
            slot.stats.taken += 1;
        }
        frame
    }

    /// True if a frame is waiting to be taken.
    pub fn has_fresh(&self) -> bool {
        self.lock().latest.is_some()
    }

    pub fn stats(&self) -> ExchangeStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Every critical section leaves the slot consistent, so a panic while
        // holding the lock does not invalidate it.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
