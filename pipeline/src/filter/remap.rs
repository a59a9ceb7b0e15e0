use frame_filter_common::config::RemapOp;
use frame_filter_common::frame::Frame;

use super::StageError;

/// Per-pixel transform of a single channel through a byte lookup table.
///
/// Every other channel is copied through unchanged.
#[derive(Clone)]
pub struct ChannelRemap {
    channel: usize,
    table: [u8; 256],
}

impl ChannelRemap {
    pub fn new(channel: usize, op: RemapOp) -> Self {
        match op {
            RemapOp::Double => Self::from_fn(channel, double_wrapping),
            RemapOp::Invert => Self::from_fn(channel, invert),
        }
    }

    /// Remap `channel` through an arbitrary pure byte function.
    pub fn from_fn(channel: usize, f: impl Fn(u8) -> u8) -> Self {
        let mut table = [0u8; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = f(i as u8);
        }
        Self { channel, table }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// The transform applied to one sample.
    pub fn map(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    pub fn apply(&self, frame: &Frame) -> Result<Frame, StageError> {
        let channels = frame.channels();
        if self.channel >= channels {
            return Err(StageError::ChannelOutOfRange {
                channel: self.channel,
                channels,
            });
        }

        let mut data = frame.as_bytes().to_vec();
        for px in data.chunks_exact_mut(channels) {
            px[self.channel] = self.table[px[self.channel] as usize];
        }
        Ok(Frame::new(frame.width(), frame.height(), channels, data)?)
    }
}

impl std::fmt::Debug for ChannelRemap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRemap")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// `(2 * x) mod 256`. Overflow wraps; it does not saturate at 255.
pub fn double_wrapping(x: u8) -> u8 {
    x.wrapping_mul(2)
}

pub fn invert(x: u8) -> u8 {
    255 - x
}
