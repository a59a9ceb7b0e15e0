/// An owned, fixed-shape 8-bit pixel buffer.
///
/// Samples are stored row-major with channels interleaved, so the sample for
/// pixel `(x, y)` and channel `ch` lives at `(y * width + x) * channels + ch`.
/// Colour frames carry 3 channels in RGB order; grayscale frames carry 1.
///
/// A `Frame` is never mutated after construction. Filters read one frame and
/// build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

/// Channel count of a grayscale frame.
pub const GRAY: usize = 1;
/// Channel count of an RGB colour frame.
pub const RGB: usize = 3;

impl Frame {
    /// Wrap `data` as a `width x height` frame with `channels` samples per pixel.
    ///
    /// Fails with [`FrameError::Shape`] unless `data.len() == width * height * channels`,
    /// and with [`FrameError::Channels`] unless `channels` is 1 or 3.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if channels != GRAY && channels != RGB {
            return Err(FrameError::Channels(channels));
        }
        let expected = sample_count(width, height, channels)?;
        if data.len() != expected {
            return Err(FrameError::Shape {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build a frame by evaluating `f(x, y, ch)` for every sample.
    pub fn from_fn<F>(
        width: usize,
        height: usize,
        channels: usize,
        mut f: F,
    ) -> Result<Self, FrameError>
    where
        F: FnMut(usize, usize, usize) -> u8,
    {
        let mut data = Vec::with_capacity(sample_count(width, height, channels)?);
        for y in 0..height {
            for x in 0..width {
                for ch in 0..channels {
                    data.push(f(x, y, ch));
                }
            }
        }
        Self::new(width, height, channels, data)
    }

    // -- Accessors ----------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns true if the frame has no pixels (zero width or zero height).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes in one row.
    pub fn row_stride(&self) -> usize {
        self.width * self.channels
    }

    /// Raw interleaved samples.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, returning its sample buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Bounds-checked read of one sample.
    pub fn sample(&self, x: usize, y: usize, ch: usize) -> Option<u8> {
        if x >= self.width || y >= self.height || ch >= self.channels {
            return None;
        }
        Some(self.data[(y * self.width + x) * self.channels + ch])
    }

    /// Bounds-checked read of all channels of one pixel.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    /// Convert to a single-channel luma frame. Grayscale frames are cloned.
    ///
    /// Uses the BT.601 weights `0.299 R + 0.587 G + 0.114 B`, rounded to nearest.
    pub fn to_grayscale(&self) -> Frame {
        if self.channels == GRAY {
            return self.clone();
        }
        let data = self
            .data
            .chunks_exact(self.channels)
            .map(|px| {
                let luma = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                ((luma + 500) / 1000) as u8
            })
            .collect();
        Frame {
            width: self.width,
            height: self.height,
            channels: GRAY,
            data,
        }
    }
}

/// `width * height * channels`, or [`FrameError::Overflow`] if that does not fit a `usize`.
fn sample_count(width: usize, height: usize, channels: usize) -> Result<usize, FrameError> {
    width
        .checked_mul(height)
        .and_then(|px| px.checked_mul(channels))
        .ok_or(FrameError::Overflow { width, height })
}

/// A frame tagged with its capture time and sequence number.
///
/// The sequence number is assigned by the capture worker and increases by one
/// per grabbed frame; consumers use it to detect dropped frames and to refuse
/// out-of-order publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedFrame {
    pub frame: Frame,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl TimestampedFrame {
    /// Tag `frame` with the current wall-clock time.
    pub fn now(frame: Frame, seq: u64) -> Self {
        Self {
            frame,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
            seq,
        }
    }

    /// Replace the pixel data while keeping the capture metadata.
    pub fn with_frame(self, frame: Frame) -> Self {
        Self {
            frame,
            captured_at_ms: self.captured_at_ms,
            seq: self.seq,
        }
    }

    /// Milliseconds elapsed since capture, measured against the current clock.
    pub fn age_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.captured_at_ms
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer has {got} bytes, expected {expected}")]
    Shape { expected: usize, got: usize },
    #[error("unsupported channel count {0}, expected 1 or 3")]
    Channels(usize),
    #[error("frame dimensions {width}x{height} overflow the address space")]
    Overflow { width: usize, height: usize },
}
