use frame_filter_common::config::StageConfig;
use frame_filter_common::frame::Frame;
use tracing::debug;

use crate::filter::{FilterStage, StageError};
use crate::kernel::SharedKernel;

/// Ordered chain of filter stages.
///
/// Holds no per-frame state, so `apply` may be called repeatedly and from
/// several threads at once.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<FilterStage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(stages: &[StageConfig], kernel: &SharedKernel) -> Self {
        Self {
            stages: stages
                .iter()
                .map(|config| FilterStage::from_config(config, kernel))
                .collect(),
        }
    }

    /// Append a stage to the end of the chain.
    pub fn with_stage(mut self, stage: FilterStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Thread `frame` through every stage in order.
    ///
    /// The first failing stage aborts the run and its error is returned as is;
    /// later stages are not attempted and no intermediate frame escapes.
    pub fn apply(&self, frame: &Frame) -> Result<Frame, StageError> {
        let Some((first, rest)) = self.stages.split_first() else {
            return Ok(frame.clone());
        };

        let mut current = run_stage(0, first, frame)?;
        for (i, stage) in rest.iter().enumerate() {
            current = run_stage(i + 1, stage, &current)?;
        }
        Ok(current)
    }
}

fn run_stage(index: usize, stage: &FilterStage, frame: &Frame) -> Result<Frame, StageError> {
    stage.apply(frame).inspect_err(|e| {
        debug!(
            index,
            stage = stage.name(),
            width = frame.width(),
            height = frame.height(),
            error = %e,
            "pipeline aborted"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_filter_common::config::{BorderPolicy, FlipAxis, OutputDepth, RemapOp};
    use frame_filter_common::frame::{GRAY, RGB};
    use frame_filter_common::kernel::Kernel;

    #[test]
    fn empty_pipeline_returns_input() {
        let frame = Frame::new(2, 1, GRAY, vec![3, 4]).unwrap();
        assert_eq!(Pipeline::new().apply(&frame).unwrap(), frame);
    }

    #[test]
    fn stages_run_in_insertion_order() {
        let frame = Frame::new(3, 1, RGB, vec![200, 0, 0, 100, 0, 0, 10, 0, 0]).unwrap();
        let pipeline = Pipeline::new()
            .with_stage(FilterStage::channel_remap(0, RemapOp::Double))
            .with_stage(FilterStage::flip(FlipAxis::Horizontal));
        let out = pipeline.apply(&frame).unwrap();
        assert_eq!(out.as_bytes(), &[20, 0, 0, 200, 0, 0, 144, 0, 0]);

        // Order matters when a later stage depends on channel layout.
        let gray_then_remap = Pipeline::new()
            .with_stage(FilterStage::convolution(
                SharedKernel::new(Kernel::identity(3).unwrap()),
                BorderPolicy::Reflect101,
                OutputDepth::Grayscale,
            ))
            .with_stage(FilterStage::channel_remap(2, RemapOp::Double));
        assert!(matches!(
            gray_then_remap.apply(&frame),
            Err(StageError::ChannelOutOfRange { channel: 2, channels: 1 })
        ));

        let remap_then_gray = Pipeline::new()
            .with_stage(FilterStage::channel_remap(2, RemapOp::Double))
            .with_stage(FilterStage::convolution(
                SharedKernel::new(Kernel::identity(3).unwrap()),
                BorderPolicy::Reflect101,
                OutputDepth::Grayscale,
            ));
        assert_eq!(remap_then_gray.apply(&frame).unwrap().channels(), GRAY);
    }

    #[test]
    fn failure_surfaces_first_error_and_pipeline_stays_usable() {
        let kernel = SharedKernel::new(Kernel::filled(3, 1.0).unwrap());
        let mut pipeline = Pipeline::new();
        pipeline.push(FilterStage::convolution(
            kernel,
            BorderPolicy::Reflect101,
            OutputDepth::Same,
        ));
        // Would fail too on a gray frame, but must never be reached for the empty one.
        pipeline.push(FilterStage::channel_remap(2, RemapOp::Double));
        assert_eq!(pipeline.len(), 2);

        let empty = Frame::new(0, 0, GRAY, Vec::new()).unwrap();
        assert!(matches!(
            pipeline.apply(&empty),
            Err(StageError::EmptyFrame { width: 0, height: 0 })
        ));

        let color = Frame::from_fn(4, 4, RGB, |_, _, ch| 10 * ch as u8).unwrap();
        let out = pipeline.apply(&color).unwrap();
        assert_eq!(out.pixel(0, 0), Some(&[0u8, 10, 40][..]));
    }

    #[test]
    fn pipeline_from_config_shares_kernel() {
        let kernel = SharedKernel::new(Kernel::identity(3).unwrap());
        let pipeline = Pipeline::from_config(
            &[StageConfig::Convolution {
                border: BorderPolicy::Reflect101,
                output: OutputDepth::Same,
            }],
            &kernel,
        );
        let names: Vec<_> = pipeline.stages().iter().map(FilterStage::name).collect();
        assert_eq!(names, ["convolution"]);

        let frame = Frame::from_fn(3, 3, GRAY, |x, y, _| (x + 3 * y) as u8 * 10).unwrap();
        assert_eq!(pipeline.apply(&frame).unwrap(), frame);

        // Editing the shared kernel changes what the next apply sees.
        kernel.update(|k| k.set_weight(1, 1, 2.0)).unwrap();
        let doubled = pipeline.apply(&frame).unwrap();
        assert_eq!(doubled.sample(1, 1, 0), Some(80));
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        let pipeline = std::sync::Arc::new(
            Pipeline::new().with_stage(FilterStage::flip(FlipAxis::Vertical)),
        );
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let pipeline = pipeline.clone();
                std::thread::spawn(move || {
                    let frame = Frame::new(1, 2, GRAY, vec![i, i + 1]).unwrap();
                    pipeline.apply(&frame).unwrap().into_bytes()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let i = i as u8;
            assert_eq!(h.join().unwrap(), vec![i + 1, i]);
        }
    }
}
