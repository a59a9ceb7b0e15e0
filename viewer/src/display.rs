use frame_filter_common::frame::TimestampedFrame;
use tracing::debug;

/// Stand-in for the UI surface: records what would have been drawn.
#[derive(Debug, Default)]
pub struct Display {
    pub shown: u64,
    /// Grabbed frames the display never got to see.
    pub skipped: u64,
    last_seq: Option<u64>,
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, frame: &TimestampedFrame) {
        if let Some(last) = self.last_seq {
            self.skipped += frame.seq.saturating_sub(last + 1);
        }
        self.last_seq = Some(frame.seq);
        self.shown += 1;
        debug!(
            seq = frame.seq,
            width = frame.frame.width(),
            height = frame.frame.height(),
            channels = frame.frame.channels(),
            age_ms = frame.age_ms(),
            "frame displayed"
        );
    }
}
