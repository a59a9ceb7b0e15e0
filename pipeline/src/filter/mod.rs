pub mod border;
pub mod convolution;
pub mod flip;
pub mod remap;

use frame_filter_common::config::{BorderPolicy, FlipAxis, OutputDepth, RemapOp, StageConfig};
use frame_filter_common::frame::{Frame, FrameError};

pub use convolution::Convolution;
pub use flip::Flip;
pub use remap::ChannelRemap;

use crate::kernel::SharedKernel;

/// One transform in a [`Pipeline`](crate::pipeline::Pipeline).
///
/// Stages are plain data plus behaviour; the only state shared between stages
/// is the kernel a `Convolution` reads.
#[derive(Debug, Clone)]
pub enum FilterStage {
    ChannelRemap(ChannelRemap),
    Convolution(Convolution),
    Flip(Flip),
}

impl FilterStage {
    pub fn channel_remap(channel: usize, op: RemapOp) -> Self {
        Self::ChannelRemap(ChannelRemap::new(channel, op))
    }

    pub fn convolution(kernel: SharedKernel, border: BorderPolicy, output: OutputDepth) -> Self {
        Self::Convolution(Convolution::new(kernel, border, output))
    }

    pub fn flip(axis: FlipAxis) -> Self {
        Self::Flip(Flip::new(axis))
    }

    /// Build a stage from its config entry. Convolution stages read `kernel`.
    pub fn from_config(config: &StageConfig, kernel: &SharedKernel) -> Self {
        match *config {
            StageConfig::ChannelRemap { channel, op } => Self::channel_remap(channel, op),
            StageConfig::Convolution { border, output } => {
                Self::convolution(kernel.clone(), border, output)
            }
            StageConfig::Flip { axis } => Self::flip(axis),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChannelRemap(_) => "channel_remap",
            Self::Convolution(_) => "convolution",
            Self::Flip(_) => "flip",
        }
    }

    /// Run this stage on `frame`, producing a new frame.
    pub fn apply(&self, frame: &Frame) -> Result<Frame, StageError> {
        match self {
            Self::ChannelRemap(stage) => stage.apply(frame),
            Self::Convolution(stage) => stage.apply(frame),
            Self::Flip(stage) => stage.apply(frame),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("cannot convolve an empty {width}x{height} frame")]
    EmptyFrame { width: usize, height: usize },
    #[error("channel {channel} does not exist in a {channels}-channel frame")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("stage produced a malformed frame: {0}")]
    Frame(#[from] FrameError),
}
