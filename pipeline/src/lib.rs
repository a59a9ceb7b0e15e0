//! Frame filter core: filter stages, the pipeline that chains them, the
//! editable convolution kernel, and the capture-to-display hand-off.
//!
//! Data flows `CaptureSource` → `Pipeline::apply` → `FrameExchange::publish`
//! → `FrameExchange::take_latest` → display. `KernelEditor` is the only writer
//! of the kernel that convolution stages read.

pub mod capture;
pub mod editor;
pub mod exchange;
pub mod filter;
pub mod kernel;
pub mod pipeline;

pub use capture::{CaptureError, CaptureSource, DeviceError, FrameCallback, FrameDevice, SourceState};
pub use editor::{EditorError, KernelEditor};
pub use exchange::{ExchangeStats, FrameExchange, Publish};
pub use filter::{FilterStage, StageError};
pub use kernel::SharedKernel;
pub use pipeline::Pipeline;
