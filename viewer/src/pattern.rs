use std::time::Duration;

use frame_filter_common::frame::{Frame, RGB};
use frame_filter_pipeline::{DeviceError, FrameDevice};

const DEFAULT_FPS: f64 = 30.0;

/// Synthetic camera producing a diagonally scrolling RGB gradient.
pub struct TestPattern {
    width: usize,
    height: usize,
    interval: Duration,
    tick: usize,
}

impl TestPattern {
    pub fn new(width: usize, height: usize, fps: f64) -> Self {
        let interval = Some(fps)
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .and_then(|fps| Duration::try_from_secs_f64(fps.recip()).ok())
            .unwrap_or(Duration::from_secs_f64(1.0 / DEFAULT_FPS));
        Self {
            width,
            height,
            interval,
            tick: 0,
        }
    }
}

impl FrameDevice for TestPattern {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn grab(&mut self) -> Result<Frame, DeviceError> {
        let t = self.tick;
        self.tick = self.tick.wrapping_add(1);
        Ok(Frame::from_fn(self.width, self.height, RGB, |x, y, ch| {
            match ch {
                0 => (x + t) as u8,
                1 => (y + t) as u8,
                _ => (x + y) as u8,
            }
        })?)
    }

    fn frame_interval(&self) -> Duration {
        self.interval
    }
}
