use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use frame_filter_common::frame::{Frame, FrameError, TimestampedFrame};
use tracing::{debug, error, info, warn};

/// A hardware (or synthetic) frame source driven by the capture worker.
pub trait FrameDevice: Send + 'static {
    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Block until the next frame is available and return it.
    fn grab(&mut self) -> Result<Frame, DeviceError>;

    /// Target time between frames. The worker sleeps off whatever part of it
    /// `grab` did not use.
    fn frame_interval(&self) -> Duration;
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device read failed: {0}")]
    Read(String),
    #[error("device produced a malformed frame: {0}")]
    Frame(#[from] FrameError),
}

/// Called on the capture thread once per grabbed frame.
pub type FrameCallback = Arc<dyn Fn(TimestampedFrame) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Stopped,
    /// A worker thread is grabbing live frames.
    Running,
    /// Serving one fixed frame on every pull.
    Static,
}

enum Mode {
    Stopped,
    Running(Worker),
    Static(Frame),
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Box<dyn FrameDevice>>,
}

/// Either a live device feeding frames to a callback, or one still frame.
///
/// | state   | `start()`         | `stop()`        | `load_still(f)`        | `pull()`           |
/// |---------|-------------------|-----------------|------------------------|--------------------|
/// | Stopped | Running           | no-op           | Static(f)              | `NoFrameAvailable` |
/// | Running | no-op             | Stopped         | stop, then Static(f)   | `NoFrameAvailable` |
/// | Static  | Running, drops f  | no-op           | Static(f), replaces    | `Ok(f)`            |
///
/// Live frames are delivered only through the callback; `pull` never blocks.
/// Once `stop()` returns the callback will not be invoked again.
pub struct CaptureSource {
    mode: Mode,
    /// Parked here whenever no worker owns it. `None` after a worker died.
    device: Option<Box<dyn FrameDevice>>,
    device_name: String,
    on_frame: FrameCallback,
    next_seq: Arc<AtomicU64>,
}

impl CaptureSource {
    pub fn new(device: impl FrameDevice, on_frame: FrameCallback) -> Self {
        Self {
            device_name: device.name().to_string(),
            device: Some(Box::new(device)),
            mode: Mode::Stopped,
            on_frame,
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> SourceState {
        mode_state(&self.mode)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_running(&self) -> bool {
        matches!(self.mode, Mode::Running(_))
    }

    /// Begin live capture. A no-op if already running; leaves Static.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running() {
            return Ok(());
        }
        let device = self.device.take().ok_or(CaptureError::DeviceLost)?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let next_seq = Arc::clone(&self.next_seq);
        let on_frame = Arc::clone(&self.on_frame);
        let handle = thread::Builder::new()
            .name("capture".into())
            .spawn(move || run_worker(device, worker_stop, next_seq, on_frame))
            .map_err(CaptureError::Spawn)?;

        let previous = std::mem::replace(&mut self.mode, Mode::Running(Worker { stop, handle }));
        info!(
            device = self.device_name,
            from = ?mode_state(&previous),
            "capture started"
        );
        Ok(())
    }

    /// Stop live capture and wait for the worker to exit. A no-op unless running.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        let Mode::Running(worker) = std::mem::replace(&mut self.mode, Mode::Stopped) else {
            return;
        };

        worker.stop.store(true, Ordering::Release);
        worker.handle.thread().unpark();
        match worker.handle.join() {
            Ok(device) => {
                self.device = Some(device);
                info!(device = self.device_name, "capture stopped");
            }
            Err(_) => {
                error!(device = self.device_name, "capture worker panicked, device lost");
            }
        }
    }

    /// Serve `frame` as a static image, stopping live capture first.
    pub fn load_still(&mut self, frame: Frame) {
        self.stop();
        info!(
            width = frame.width(),
            height = frame.height(),
            channels = frame.channels(),
            "still image loaded"
        );
        self.mode = Mode::Static(frame);
    }

    /// The current still frame, stamped with the next sequence number.
    ///
    /// Fails with [`CaptureError::NoFrameAvailable`] unless the source is Static.
    pub fn pull(&self) -> Result<TimestampedFrame, CaptureError> {
        match &self.mode {
            Mode::Static(frame) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                Ok(TimestampedFrame::now(frame.clone(), seq))
            }
            _ => Err(CaptureError::NoFrameAvailable),
        }
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn mode_state(mode: &Mode) -> SourceState {
    match mode {
        Mode::Stopped => SourceState::Stopped,
        Mode::Running(_) => SourceState::Running,
        Mode::Static(_) => SourceState::Static,
    }
}

fn run_worker(
    mut device: Box<dyn FrameDevice>,
    stop: Arc<AtomicBool>,
    next_seq: Arc<AtomicU64>,
    on_frame: FrameCallback,
) -> Box<dyn FrameDevice> {
    let interval = device.frame_interval();
    debug!(device = device.name(), ?interval, "capture worker running");

    while !stop.load(Ordering::Acquire) {
        let started = Instant::now();
        match device.grab() {
            Ok(frame) => {
                let seq = next_seq.fetch_add(1, Ordering::Relaxed);
                debug!(seq, width = frame.width(), height = frame.height(), "frame grabbed");
                on_frame(TimestampedFrame::now(frame, seq));
            }
            Err(e) => {
                warn!(error = %e, device = device.name(), "frame grab failed, skipping");
            }
        }

        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            if !stop.load(Ordering::Acquire) {
                thread::park_timeout(rest);
            }
        }
    }

    debug!(device = device.name(), "capture worker exiting");
    device
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no frame available: source is not serving a still image")]
    NoFrameAvailable,
    #[error("capture device was lost when its worker panicked")]
    DeviceLost,
    #[error("failed to spawn capture worker: {0}")]
    Spawn(std::io::Error),
}
