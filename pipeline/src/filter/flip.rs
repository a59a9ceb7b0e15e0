use frame_filter_common::config::FlipAxis;
use frame_filter_common::frame::Frame;

use super::StageError;

/// Mirror a frame across one axis. Shape-preserving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flip {
    pub axis: FlipAxis,
}

impl Flip {
    pub fn new(axis: FlipAxis) -> Self {
        Self { axis }
    }

    pub fn apply(&self, frame: &Frame) -> Result<Frame, StageError> {
        if frame.is_empty() {
            return Ok(frame.clone());
        }

        let channels = frame.channels();
        let stride = frame.row_stride();
        let src = frame.as_bytes();
        let mut data = Vec::with_capacity(src.len());

        match self.axis {
            FlipAxis::Horizontal => {
                for row in src.chunks_exact(stride) {
                    for px in row.chunks_exact(channels).rev() {
                        data.extend_from_slice(px);
                    }
                }
            }
            FlipAxis::Vertical => {
                for row in src.chunks_exact(stride).rev() {
                    data.extend_from_slice(row);
                }
            }
        }

        Ok(Frame::new(frame.width(), frame.height(), channels, data)?)
    }
}
